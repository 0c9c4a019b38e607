//! Append-only trade log: one executed fill per line, as JSON.

use basalt_wire::Execution;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub struct TradeLog {
    file: File,
}

impl TradeLog {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub fn append(&mut self, execution: &Execution) -> io::Result<()> {
        let line = serde_json::to_string(execution)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_wire::{ExecStatus, Side};

    #[test]
    fn appends_one_json_line_per_fill() {
        let path = std::env::temp_dir().join(format!("basalt_trades_{}", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut log = TradeLog::open(&path).unwrap();
        for i in 0..2 {
            log.append(&Execution {
                execution_id: format!("EXEC_{i}"),
                order_id: format!("ORD_{i}"),
                symbol: "AAPL".into(),
                side: Side::Buy,
                quantity: 10,
                order_price: 150.0,
                execution_price: 150.05,
                status: ExecStatus::Filled,
            })
            .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for (i, line) in lines.iter().enumerate() {
            let parsed: Execution = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.execution_id, format!("EXEC_{i}"));
            assert_eq!(parsed.status, ExecStatus::Filled);
        }

        let _ = std::fs::remove_file(&path);
    }
}
