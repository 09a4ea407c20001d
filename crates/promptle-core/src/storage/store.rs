use crate::embeddings::util::{decode_vec_f32, encode_vec_f32};
use crate::errors::LedgerError;
use crate::model::{Challenge, Guess, NewChallenge, NewGuess};
use crate::storage::{ChallengeStore, GuessStore};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const DATE_FMT: &str = "%Y-%m-%d";

/// SQLite-backed challenge and guess store. Cloning shares the connection.
#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub challenges: u64,
    pub guesses: u64,
}

type ChallengeRaw = (
    String,
    String,
    String,
    Option<Vec<u8>>,
    Option<i64>,
    Option<String>,
    Option<String>,
);

type GuessRaw = (i64, String, String, String, Option<String>, f64, u32, String);

const CHALLENGE_COLS: &str =
    "id, date, image_url, embedding, embedding_dims, photographer_name, photographer_url";

const GUESS_COLS: &str =
    "id, user_id, challenge_id, prompt, generated_image_url, score, attempt_number, created_at";

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("sqlite connection mutex poisoned"))
    }

    pub fn stats(&self) -> anyhow::Result<StoreStats> {
        let conn = self.lock()?;
        let challenges: i64 = conn.query_row("SELECT count(*) FROM challenges", [], |r| r.get(0))?;
        let guesses: i64 = conn.query_row("SELECT count(*) FROM guesses", [], |r| r.get(0))?;
        Ok(StoreStats {
            challenges: challenges as u64,
            guesses: guesses as u64,
        })
    }

    // challenges
    pub fn challenge_by_id(&self, id: &str) -> anyhow::Result<Option<Challenge>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM challenges WHERE id = ?1", CHALLENGE_COLS),
                params![id],
                challenge_raw,
            )
            .optional()?;
        raw.map(challenge_from_raw).transpose()
    }

    pub fn challenge_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM challenges WHERE date = ?1", CHALLENGE_COLS),
                params![date.format(DATE_FMT).to_string()],
                challenge_raw,
            )
            .optional()?;
        raw.map(challenge_from_raw).transpose()
    }

    pub fn put_challenge(&self, c: &NewChallenge) -> anyhow::Result<Challenge> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO challenges(id, date, image_url, photographer_name, photographer_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                c.id,
                c.date.format(DATE_FMT).to_string(),
                c.image_url,
                c.photographer_name,
                c.photographer_url,
                now_rfc3339()
            ],
        )
        .with_context(|| format!("failed to insert challenge {} for {}", c.id, c.date))?;
        Ok(Challenge {
            id: c.id.clone(),
            date: c.date,
            image_url: c.image_url.clone(),
            embedding: None,
            photographer_name: c.photographer_name.clone(),
            photographer_url: c.photographer_url.clone(),
        })
    }

    pub fn put_embedding(&self, id: &str, vec: &[f32]) -> anyhow::Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE challenges SET embedding = ?1, embedding_dims = ?2 WHERE id = ?3",
            params![encode_vec_f32(vec), vec.len() as i64, id],
        )?;
        if changed == 0 {
            anyhow::bail!("challenge {} not found", id);
        }
        Ok(())
    }

    // guesses
    pub fn put_guess(&self, g: &NewGuess) -> Result<Guess, LedgerError> {
        let conn = self.lock().map_err(LedgerError::Storage)?;
        let stamp = now_rfc3339();
        let res = conn.execute(
            "INSERT INTO guesses(user_id, challenge_id, prompt, generated_image_url, score, attempt_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                g.user_id,
                g.challenge_id,
                g.prompt,
                g.generated_image_url,
                g.score,
                g.attempt_number,
                stamp
            ],
        );
        match res {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(LedgerError::Conflict {
                    attempt_number: g.attempt_number,
                })
            }
            Err(e) => {
                return Err(LedgerError::Storage(
                    anyhow::Error::new(e).context("failed to insert guess"),
                ))
            }
        }

        Ok(Guess {
            id: conn.last_insert_rowid(),
            user_id: g.user_id.clone(),
            challenge_id: g.challenge_id.clone(),
            prompt: g.prompt.clone(),
            generated_image_url: g.generated_image_url.clone(),
            score: g.score,
            attempt_number: g.attempt_number,
            created_at: parse_ts(&stamp).map_err(LedgerError::Storage)?,
        })
    }

    pub fn guess_count(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<u32> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT count(*) FROM guesses WHERE user_id = ?1 AND challenge_id = ?2",
            params![user_id, challenge_id],
            |r| r.get(0),
        )?;
        Ok(n as u32)
    }

    pub fn guesses_for(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Vec<Guess>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM guesses WHERE user_id = ?1 AND challenge_id = ?2 ORDER BY attempt_number ASC",
            GUESS_COLS
        ))?;
        let rows = stmt.query_map(params![user_id, challenge_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(guess_from_raw(r?)?);
        }
        Ok(out)
    }

    pub fn best_score_for(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Option<f64>> {
        let conn = self.lock()?;
        let best: Option<f64> = conn.query_row(
            "SELECT MAX(score) FROM guesses WHERE user_id = ?1 AND challenge_id = ?2",
            params![user_id, challenge_id],
            |r| r.get(0),
        )?;
        Ok(best)
    }

    async fn blocking<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .context("sqlite task panicked")?
    }
}

#[async_trait]
impl ChallengeStore for Store {
    async fn get_challenge(&self, id: &str) -> anyhow::Result<Option<Challenge>> {
        let id = id.to_string();
        self.blocking(move |s| s.challenge_by_id(&id)).await
    }

    async fn set_embedding(&self, id: &str, embedding: &[f32]) -> anyhow::Result<()> {
        let id = id.to_string();
        let embedding = embedding.to_vec();
        self.blocking(move |s| s.put_embedding(&id, &embedding)).await
    }

    async fn insert_challenge(&self, challenge: &NewChallenge) -> anyhow::Result<Challenge> {
        let challenge = challenge.clone();
        self.blocking(move |s| s.put_challenge(&challenge)).await
    }

    async fn challenge_for_date(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>> {
        self.blocking(move |s| s.challenge_by_date(date)).await
    }
}

#[async_trait]
impl GuessStore for Store {
    async fn insert_guess(&self, guess: &NewGuess) -> Result<Guess, LedgerError> {
        let guess = guess.clone();
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.put_guess(&guess))
            .await
            .map_err(|e| LedgerError::Storage(anyhow::anyhow!("sqlite task panicked: {}", e)))?
    }

    async fn count_guesses(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<u32> {
        let (u, c) = (user_id.to_string(), challenge_id.to_string());
        self.blocking(move |s| s.guess_count(&u, &c)).await
    }

    async fn list_guesses(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Vec<Guess>> {
        let (u, c) = (user_id.to_string(), challenge_id.to_string());
        self.blocking(move |s| s.guesses_for(&u, &c)).await
    }

    async fn max_score(&self, user_id: &str, challenge_id: &str) -> anyhow::Result<Option<f64>> {
        let (u, c) = (user_id.to_string(), challenge_id.to_string());
        self.blocking(move |s| s.best_score_for(&u, &c)).await
    }
}

fn challenge_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChallengeRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn challenge_from_raw(raw: ChallengeRaw) -> anyhow::Result<Challenge> {
    let (id, date, image_url, blob, dims, photographer_name, photographer_url) = raw;
    let date = NaiveDate::parse_from_str(&date, DATE_FMT)
        .with_context(|| format!("challenge {} has invalid date {:?}", id, date))?;
    let embedding = blob.map(|b| decode_vec_f32(&b)).transpose()?;
    // A blob that disagrees with its recorded length is dropped so the cache refills it.
    let embedding = match (embedding, dims) {
        (Some(v), Some(d)) if v.len() as i64 != d => {
            tracing::warn!(
                event = "promptle.store.embedding_dims_mismatch",
                challenge_id = %id,
                stored_dims = d,
                decoded_dims = v.len()
            );
            None
        }
        (embedding, _) => embedding,
    };
    Ok(Challenge {
        id,
        date,
        image_url,
        embedding,
        photographer_name,
        photographer_url,
    })
}

fn guess_from_raw(raw: GuessRaw) -> anyhow::Result<Guess> {
    let (id, user_id, challenge_id, prompt, generated_image_url, score, attempt_number, ts) = raw;
    Ok(Guess {
        id,
        user_id,
        challenge_id,
        prompt,
        generated_image_url,
        score,
        attempt_number,
        created_at: parse_ts(&ts)?,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid timestamp {:?}", s))?
        .with_timezone(&Utc))
}
