// Kernel logger backed by the console Printer, wired up for the `log` crate
// facade so init-order messages and driver traces share one sink.

use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::printf!("[{}] {}\n", record.level(), record.args());
    }

    fn flush(&self) {}
}

pub fn init() {
    // log::set_logger fails only if called twice; the kernel calls this
    // once per boot, from hart 0 only.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Info);
}
