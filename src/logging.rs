use log::LevelFilter;

/// Handle over the process logger; the level is changed through it, not through globals.
#[derive(Debug, Clone, Copy)]
pub struct Logging {
    base: LevelFilter,
}

impl Logging {
    /// Installs env_logger. `RUST_LOG`, when set, decides the base level.
    pub fn init() -> Self {
        let from_env = std::env::var_os("RUST_LOG").is_some();
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .parse_env("RUST_LOG")
            .init();
        let base = if from_env {
            log::max_level()
        } else {
            LevelFilter::Warn
        };
        log::set_max_level(base);
        Self { base }
    }

    pub fn set_debug(&self, debug: bool) {
        log::set_max_level(self.level_for(debug));
    }

    fn level_for(&self, debug: bool) -> LevelFilter {
        if debug {
            self.base.max(LevelFilter::Debug)
        } else {
            self.base
        }
    }
}
