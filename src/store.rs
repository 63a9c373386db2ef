use crate::dates;
use crate::scorer::ScoreOutput;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_derive::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    symbol TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS announcements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_id INTEGER NOT NULL REFERENCES stocks(id),
    title TEXT NOT NULL,
    date_time TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_id INTEGER NOT NULL REFERENCES stocks(id),
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    pertinency INTEGER NOT NULL,
    sentiment INTEGER NOT NULL,
    source TEXT NOT NULL,
    start_price REAL NOT NULL,
    end_price REAL NOT NULL,
    date_time TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS description (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_id INTEGER NOT NULL REFERENCES stocks(id),
    description TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS messages_by_stock ON messages (stock_id, date_time);
CREATE INDEX IF NOT EXISTS announcements_by_stock ON announcements (stock_id, date_time);
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stock {
    pub id: i64,
    pub name: String,
    pub symbol: String,
}

impl Stock {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            symbol: row.get("symbol")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub title: String,
    pub date_time: String,
    /// `date_time` in dashboard notation
    pub date_display: String,
}

impl Announcement {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let date_time: String = row.get("date_time")?;
        Ok(Self {
            title: row.get("title")?,
            date_display: dates::display(&date_time),
            date_time,
        })
    }
}

/// A stored news item with its scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub pertinency: i64,
    pub sentiment: i64,
    pub source: String,
    pub start_price: f64,
    pub end_price: f64,
    pub date_time: String,
}

impl Message {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            pertinency: row.get("pertinency")?,
            sentiment: row.get("sentiment")?,
            source: row.get("source")?,
            start_price: row.get("start_price")?,
            end_price: row.get("end_price")?,
            date_time: row.get("date_time")?,
        })
    }
}

/// Message fields supplied by the submitter
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFields {
    pub title: String,
    pub content: String,
    pub source: String,
    pub start_price: f64,
    pub end_price: f64,
    pub date_time: String,
}

/// Aggregate of the scored messages of one stock
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentSummary {
    /// Mean sentiment rounded to two decimals, `0` without messages
    pub mean_sentiment: f64,
    pub positive_count: i64,
    pub negative_count: i64,
}

impl SentimentSummary {
    pub fn recommendation(&self) -> &'static str {
        if self.positive_count > self.negative_count {
            "Buy"
        } else {
            "Sell"
        }
    }
}

/// SQLite-backed persistence for stocks and their news
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn add_stock(&self, name: &str, symbol: &str) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO stocks (name, symbol) VALUES (?1, ?2)",
            params![name, symbol],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn stock_by_symbol(&self, symbol: &str) -> Result<Option<Stock>, StoreError> {
        let conn = self.conn()?;
        let stock = conn
            .query_row(
                "SELECT id, name, symbol FROM stocks WHERE symbol = ?1 ORDER BY id LIMIT 1",
                params![symbol],
                Stock::from_row,
            )
            .optional()?;
        Ok(stock)
    }

    /// Stocks whose name contains `query`
    pub fn search_stocks(&self, query: &str) -> Result<Vec<Stock>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, symbol FROM stocks WHERE name LIKE ?1 ORDER BY name")?;
        let stocks = stmt
            .query_map(params![format!("%{}%", query)], Stock::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stocks)
    }

    pub fn add_announcement(
        &self,
        stock_id: i64,
        title: &str,
        date_time: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO announcements (stock_id, title, date_time) VALUES (?1, ?2, ?3)",
            params![stock_id, title, date_time],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn latest_announcement(&self, stock_id: i64) -> Result<Option<Announcement>, StoreError> {
        let conn = self.conn()?;
        let announcement = conn
            .query_row(
                "SELECT title, date_time FROM announcements
                 WHERE stock_id = ?1
                 ORDER BY date_time DESC
                 LIMIT 1",
                params![stock_id],
                Announcement::from_row,
            )
            .optional()?;
        Ok(announcement)
    }

    /// Announcements of every stock listed under `symbol`, newest first
    pub fn announcements_for_symbol(&self, symbol: &str) -> Result<Vec<Announcement>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT a.title, a.date_time
             FROM announcements a
             JOIN stocks s ON a.stock_id = s.id
             WHERE s.symbol = ?1
             ORDER BY a.date_time DESC",
        )?;
        let announcements = stmt
            .query_map(params![symbol], Announcement::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(announcements)
    }

    pub fn add_message(
        &self,
        stock_id: i64,
        fields: &MessageFields,
        score: &ScoreOutput,
    ) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages
                (stock_id, title, content, pertinency, sentiment, source, start_price, end_price, date_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                stock_id,
                fields.title,
                fields.content,
                score.pertinency.code(),
                score.sentiment,
                fields.source,
                fields.start_price,
                fields.end_price,
                fields.date_time,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Replace a message and its scores, returning whether it existed
    pub fn update_message(
        &self,
        message_id: i64,
        fields: &MessageFields,
        score: &ScoreOutput,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE messages
             SET date_time = ?1, title = ?2, content = ?3, source = ?4, start_price = ?5,
                 end_price = ?6, pertinency = ?7, sentiment = ?8
             WHERE id = ?9",
            params![
                fields.date_time,
                fields.title,
                fields.content,
                fields.source,
                fields.start_price,
                fields.end_price,
                score.pertinency.code(),
                score.sentiment,
                message_id,
            ],
        )?;
        Ok(updated > 0)
    }

    /// A page of messages, newest first
    pub fn messages(
        &self,
        stock_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, content, pertinency, sentiment, source, start_price, end_price, date_time
             FROM messages
             WHERE stock_id = ?1
             ORDER BY date_time DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let messages = stmt
            .query_map(params![stock_id, limit, offset], Message::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    pub fn sentiment_summary(&self, stock_id: i64) -> Result<SentimentSummary, StoreError> {
        let conn = self.conn()?;
        let (mean, positive_count, negative_count): (f64, i64, i64) = conn.query_row(
            "SELECT
                COALESCE(AVG(sentiment), 0),
                COALESCE(SUM(CASE WHEN pertinency = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN pertinency = 2 THEN 1 ELSE 0 END), 0)
             FROM messages
             WHERE stock_id = ?1",
            params![stock_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(SentimentSummary {
            mean_sentiment: (mean * 100.0).round() / 100.0,
            positive_count,
            negative_count,
        })
    }

    pub fn add_description(&self, stock_id: i64, description: &str) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO description (stock_id, description) VALUES (?1, ?2)",
            params![stock_id, description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns whether a description existed for the stock
    pub fn update_description(&self, stock_id: i64, description: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE description SET description = ?1 WHERE stock_id = ?2",
            params![description, stock_id],
        )?;
        Ok(updated > 0)
    }

    pub fn description(&self, stock_id: i64) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let description = conn
            .query_row(
                "SELECT description FROM description WHERE stock_id = ?1 ORDER BY id LIMIT 1",
                params![stock_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(description)
    }
}
