//! Interaction history.
//!
//! Every answered question becomes a row in a spreadsheet
//! (`Time, Prompt, Response, Style`). Appends rewrite the whole workbook:
//! load every row, add the new one, write through a temp file, then
//! replace the existing file.

use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::Local;
use rust_xlsxwriter::Workbook;
use tracing::{debug, info};

use crate::error::LogError;

const COLUMNS: [&str; 4] = ["Time", "Prompt", "Response", "Style"];
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub time: String,
    pub prompt: String,
    pub response: String,
    pub style: String,
}

impl LogRecord {
    /// Stamp a new record with the current local time.
    pub fn now(prompt: &str, response: &str, style: &str) -> Self {
        Self {
            time: Local::now().format(TIME_FORMAT).to_string(),
            prompt: prompt.to_string(),
            response: response.to_string(),
            style: style.to_string(),
        }
    }

    fn fields(&self) -> [&str; 4] {
        [&self.time, &self.prompt, &self.response, &self.style]
    }
}

/// The on-disk log table.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one exchange and return the row that was written.
    pub fn append(&self, question: &str, reply: &str, tone: &str) -> Result<LogRecord, LogError> {
        let record = LogRecord::now(question, reply, tone);
        self.append_record(record.clone())?;
        Ok(record)
    }

    /// Append a prebuilt record, keeping every existing row in order.
    pub fn append_record(&self, record: LogRecord) -> Result<(), LogError> {
        let mut records = self.load_all()?;
        records.push(record);
        self.write_all(&records)?;
        debug!("Saved interaction #{} to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Every stored row in insertion order; a missing file is an empty log.
    pub fn load_all(&self) -> Result<Vec<LogRecord>, LogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let read_err = |detail: String| LogError::Read {
            path: self.path.clone(),
            detail,
        };

        let mut workbook: Xlsx<_> =
            open_workbook(&self.path).map_err(|e: calamine::XlsxError| read_err(e.to_string()))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| read_err(e.to_string()))?,
            None => return Ok(Vec::new()),
        };

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };

        let column_of = |name: &str| {
            header
                .iter()
                .position(|cell| cell_text(cell).trim() == name)
        };
        let positions: Vec<Option<usize>> = COLUMNS.iter().copied().map(column_of).collect();
        if positions.iter().all(Option::is_none) {
            return Err(read_err("no Time/Prompt/Response/Style header".to_string()));
        }

        let field = |row: &[Data], idx: usize| {
            positions[idx]
                .and_then(|col| row.get(col))
                .map(cell_text)
                .unwrap_or_default()
        };

        let records = rows
            .map(|row| LogRecord {
                time: field(row, 0),
                prompt: field(row, 1),
                response: field(row, 2),
                style: field(row, 3),
            })
            .collect();

        Ok(records)
    }

    fn write_all(&self, records: &[LogRecord]) -> Result<(), LogError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, name) in COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name)?;
        }
        for (i, record) in records.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, value) in record.fields().iter().enumerate() {
                sheet.write_string(row, col as u16, *value)?;
            }
        }

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let staged = tempfile::Builder::new()
            .prefix(".chat_log")
            .suffix(".xlsx")
            .tempfile_in(&dir)?;
        workbook.save(staged.path())?;
        staged.persist(&self.path).map_err(|e| LogError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        info!("Wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Plain-text table of the log for terminal output.
pub fn render_table(records: &[LogRecord]) -> String {
    if records.is_empty() {
        return "No previous records available.".to_string();
    }

    let mut lines = vec![
        format!("{:<19}  {:<30}  {:<40}  {}", "Time", "Prompt", "Response", "Style"),
        format!("{}  {}  {}  {}", "-".repeat(19), "-".repeat(30), "-".repeat(40), "-".repeat(8)),
    ];
    for r in records {
        lines.push(format!(
            "{:<19}  {:<30}  {:<40}  {}",
            r.time,
            truncate(&r.prompt, 30),
            truncate(&r.response, 40),
            r.style
        ));
    }
    lines.join("\n")
}
