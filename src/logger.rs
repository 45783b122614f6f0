use std::fs::{create_dir_all, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Log event types that determine which receivers should log the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    /// Per-interval data from a pacing run (one line per simulated interval)
    Interval,
    /// Controller activity (target retargets, module switches, warm-up)
    Convergence,
    /// Variant-level data (final results of one simulated variant)
    Variant,
    /// Scenario-level data (comparisons between variants, scenario summaries)
    Scenario,
    /// Validation results (pass/fail messages, validation checks)
    Validation,
}

/// Trait for log receivers that can receive log messages
pub trait LogReceiver: Send {
    /// Check if this receiver should handle the given log event
    fn should_log(&self, event: LogEvent) -> bool;

    /// Write a string to this receiver
    fn write(&mut self, s: &str) -> io::Result<()>;

    /// Flush this receiver
    fn flush(&mut self) -> io::Result<()>;
}

/// Console log receiver (writes to stdout)
pub struct ConsoleReceiver {
    enabled_events: Vec<LogEvent>,
}

impl ConsoleReceiver {
    /// Create a new console receiver, boxed and ready to add to a logger
    pub fn new(enabled_events: Vec<LogEvent>) -> Box<dyn LogReceiver> {
        Box::new(Self { enabled_events })
    }
}

impl LogReceiver for ConsoleReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        print!("{}", s);
        io::stdout().flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// File log receiver (writes to a file, truncating any existing content)
pub struct FileReceiver {
    file: File,
    enabled_events: Vec<LogEvent>,
}

impl FileReceiver {
    /// Create a new file receiver that writes to the specified path.
    /// Parent directories are created if needed. Panics if file creation fails.
    pub fn new(path: &Path, enabled_events: Vec<LogEvent>) -> Box<dyn LogReceiver> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent).expect("Failed to create log directory");
        }
        let file = File::create(path).expect("Failed to create log file");
        Box::new(Self { file, enabled_events })
    }
}

impl LogReceiver for FileReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        write!(self.file, "{}", s)?;
        self.file.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// In-memory receiver, used by tests and scenarios that want to inspect
/// what a run logged without touching the filesystem
pub struct MemoryReceiver {
    buffer: Arc<Mutex<String>>,
    enabled_events: Vec<LogEvent>,
}

impl MemoryReceiver {
    /// Create a memory receiver plus a handle to its shared buffer
    pub fn new(enabled_events: Vec<LogEvent>) -> (Box<dyn LogReceiver>, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        let receiver = Box::new(Self {
            buffer: Arc::clone(&buffer),
            enabled_events,
        });
        (receiver, buffer)
    }
}

impl LogReceiver for MemoryReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        self.buffer.lock().unwrap().push_str(s);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Unique identifier for a receiver within one logger
pub type ReceiverId = usize;

/// Main logger that routes messages to the receivers enabled for each event
pub struct Logger {
    receivers: Vec<(ReceiverId, Box<dyn LogReceiver>)>,
    next_id: ReceiverId,
}

impl Logger {
    /// Create a new logger with no receivers
    pub fn new() -> Self {
        Self {
            receivers: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a receiver to the logger and return its unique ID
    pub fn add_receiver(&mut self, receiver: Box<dyn LogReceiver>) -> ReceiverId {
        let id = self.next_id;
        self.next_id += 1;
        self.receivers.push((id, receiver));
        id
    }

    /// Remove a receiver by its ID
    pub fn remove_receiver(&mut self, id: ReceiverId) {
        self.receivers.retain(|(receiver_id, _)| *receiver_id != id);
    }

    /// Write a message with a specific log event type
    pub fn log(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            if receiver.should_log(event) {
                receiver.write(message)?;
            }
        }
        Ok(())
    }

    /// Write a message with newline
    pub fn logln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log(event, &format!("{}\n", message))
    }

    /// Flush all receivers
    pub fn flush(&mut self) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            receiver.flush()?;
        }
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize a string to be used as a filename
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Macro to log a formatted string (like println! but for logger)
#[macro_export]
macro_rules! logln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.logln($event, &format!($($arg)*));
        }
    };
}

/// Macro to log a formatted string without newline (like print! but for logger)
#[macro_export]
macro_rules! log {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.log($event, &format!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test name"), "test_name");
        assert_eq!(sanitize_filename("test/name"), "test_name");
        assert_eq!(sanitize_filename("test:name"), "test_name");
    }

    #[test]
    fn test_memory_receiver_routing() {
        let mut logger = Logger::new();
        let (receiver, buffer) = MemoryReceiver::new(vec![LogEvent::Validation]);
        let id = logger.add_receiver(receiver);

        logger.logln(LogEvent::Validation, "kept").unwrap();
        logger.logln(LogEvent::Interval, "dropped").unwrap();

        assert_eq!(buffer.lock().unwrap().as_str(), "kept\n");

        logger.remove_receiver(id);
        logger.logln(LogEvent::Validation, "after removal").unwrap();
        assert_eq!(buffer.lock().unwrap().as_str(), "kept\n");
    }
}
