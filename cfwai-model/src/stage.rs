use std::fmt;

/// One of the three pipeline stages. Used to name queue files
/// (`<stage>_queue.json`), current-item files (`current_<stage>.json`),
/// and HTTP lifecycle routes (`/api/start_<stage>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Decision,
    Aging,
    Download,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Decision, Stage::Aging, Stage::Download];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Decision => "decision",
            Stage::Aging => "aging",
            Stage::Download => "download",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
