//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `log_sink`     | EventSink          | `log` facade (console)      |
//! | `json_sink`    | EventSink          | JSON lines on any writer    |
//! | `config_file`  | ConfigPort         | JSON file on disk           |
//! |                | ProfileSource      |                             |
//! | `fault_panel`  | FaultSignals       | Manually toggled fault lines|
//! | `console`      | —                  | stdin line parser           |

pub mod config_file;
pub mod console;
pub mod fault_panel;
pub mod json_sink;
pub mod log_sink;
