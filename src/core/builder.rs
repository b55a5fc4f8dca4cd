use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::BusError;
use crate::executors::{BackgroundPool, MainLoop, MainThread};

use super::bus::{Bus, DEFAULT};
use super::config::Config;

/// Builder for constructing a [`Bus`] with optional host integration.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use eventline::{Bus, Config, MainLoop};
///
/// let (main, mut driver) = MainLoop::new();
/// let bus = Bus::builder(Config::default())
///     .with_main_thread(Arc::new(main))
///     .build();
///
/// bus.post(1_u8);
/// driver.run_pending(); // once per frame of the host loop
/// ```
pub struct BusBuilder {
    cfg: Config,
    main: Option<Arc<dyn MainThread>>,
    runtime: Option<Handle>,
}

impl BusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            main: None,
            runtime: None,
        }
    }

    /// Uses `main` as the main thread instead of a dedicated [`MainLoop`] thread.
    ///
    /// Use it to bind `Main` callbacks to the host's UI or event loop.
    pub fn with_main_thread(mut self, main: Arc<dyn MainThread>) -> Self {
        self.main = Some(main);
        self
    }

    /// Runs `Background`/`Async` callbacks on the blocking pool of an existing runtime.
    ///
    /// Without it the bus builds its own runtime on first use, sized by
    /// [`Config::max_background_threads`] and [`Config::background_keep_alive`].
    pub fn with_runtime_handle(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds the bus. No thread is started until a delivery needs one.
    pub fn build(self) -> Bus {
        let Self { cfg, main, runtime } = self;

        let main: Arc<dyn MainThread> = match main {
            Some(main) => main,
            None => Arc::new(MainLoop::dedicated(cfg.main_thread_name.clone())),
        };
        let pool = match runtime {
            Some(handle) => BackgroundPool::with_handle(handle),
            None => BackgroundPool::new(
                cfg.background_thread_name.clone(),
                cfg.background_thread_limit(),
                cfg.background_keep_alive,
            ),
        };
        Bus::from_parts(cfg, main, pool)
    }

    /// Builds the bus and installs it as the process-wide default.
    ///
    /// Fails with [`BusError::DefaultAlreadyInstalled`] if a default exists, including one
    /// created lazily by [`Bus::get_default`]. Call it early, before anything posts.
    pub fn install_default(self) -> Result<&'static Bus, BusError> {
        if DEFAULT.get().is_some() {
            return Err(BusError::DefaultAlreadyInstalled);
        }
        DEFAULT
            .set(self.build())
            .map_err(|_| BusError::DefaultAlreadyInstalled)?;
        DEFAULT.get().ok_or(BusError::DefaultAlreadyInstalled)
    }
}
