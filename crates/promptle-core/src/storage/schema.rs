pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS challenges (
  id TEXT PRIMARY KEY,
  date TEXT NOT NULL UNIQUE,
  image_url TEXT NOT NULL,
  embedding BLOB,
  embedding_dims INTEGER,
  photographer_name TEXT,
  photographer_url TEXT,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS guesses (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id TEXT NOT NULL,
  challenge_id TEXT NOT NULL REFERENCES challenges(id),
  prompt TEXT NOT NULL CHECK (length(prompt) BETWEEN 1 AND 100),
  generated_image_url TEXT,
  score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
  attempt_number INTEGER NOT NULL CHECK (attempt_number BETWEEN 1 AND 3),
  created_at TEXT NOT NULL,
  UNIQUE (user_id, challenge_id, attempt_number)
);

CREATE INDEX IF NOT EXISTS idx_guesses_user_challenge ON guesses(user_id, challenge_id);
"#;
