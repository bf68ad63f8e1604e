mod log;
mod payload;
mod task;

pub use log::{ActivityLogEntry, LogLevel, NewLogEntry};
pub use payload::{
    AntipublicGraphs, AntipublicResults, AntipublicSettings, BandwidthPoint, CountPoint,
    DehasherGraphs, DehasherResults, DehasherSettings, DumperGraphs, DumperResults,
    DumperSettings, ParserGraphs, ParserResults, ParserSettings, ScraperGraphs, ScraperResults,
    ScraperSettings, SpeedPoint, TaskPayload, UsagePoint, ValuePoint, VulnerabilityCount,
    VulnerabilityGraphs, VulnerabilityResults, VulnerabilitySettings,
};
pub use task::{MAX_PROGRESS, NewTask, Task, TaskKind, TaskPatch, TaskStatus};
