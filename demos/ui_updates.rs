//! # Example: ui_updates
//!
//! Demonstrates a host-driven main thread: worker threads post progress, the "UI"
//! renders it on the main thread, and slow work is pushed to the background pool.
//!
//! Shows how to:
//! - Inject a [`MainLoop`] driven by the program's own main thread.
//! - Declare callbacks with different [`ThreadMode`]s and priorities.
//! - Replay the current theme to late subscribers with sticky messages.
//! - Observe failures through [`SubscriberFailed`].
//!
//! ## Flow
//! ```text
//! worker thread ──► bus.post(Progress) ──► Screen::render      (Main: queued, runs in driver.run)
//!                                     └──► Audit::record        (Posting: inline on worker)
//! worker thread ──► bus.post(Finished) ──► Screen::done         (Main: cancels the driver)
//!                                     └──► Archive::store       (Async: background pool)
//! main thread   ──► driver.run(token)  (the main thread of this program)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example ui_updates
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use eventline::{
    Bus, Config, MainLoop, Methods, Subscribe, Subscriber, SubscriberFailed, ThreadMode,
};
use tokio_util::sync::CancellationToken;

/// Download progress in percent.
struct Progress(u32);

/// Download finished with the given size.
struct Finished {
    bytes: usize,
}

/// Current UI theme; posted sticky so late screens pick it up.
#[derive(Debug)]
struct Theme(&'static str);

/// Renders on the main thread.
struct Screen {
    stop: CancellationToken,
}

impl Subscriber for Screen {
    fn subscribe(methods: &mut Methods<Self>) {
        methods
            .on("apply_theme", Subscribe::main().sticky(true), |_: &Screen, t: &Theme| {
                println!("[screen] theme={}", t.0);
            })
            .on("render", Subscribe::main(), |_: &Screen, p: &Progress| {
                println!("[screen] progress {:>3}%", p.0);
            })
            .on("done", Subscribe::main(), |this: &Screen, f: &Finished| {
                println!("[screen] finished: {} bytes", f.bytes);
                this.stop.cancel();
            });
    }

    fn name(&self) -> &'static str {
        "screen"
    }
}

/// Counts progress updates before the screen sees them.
#[derive(Default)]
struct Audit {
    seen: AtomicU32,
}

impl Subscriber for Audit {
    fn subscribe(methods: &mut Methods<Self>) {
        methods.on("record", Subscribe::posting().priority(100), |this: &Audit, _: &Progress| {
            this.seen.fetch_add(1, Ordering::Relaxed);
        });
    }

    fn name(&self) -> &'static str {
        "audit"
    }
}

/// Slow persistence; fails for empty downloads.
struct Archive;

impl Subscriber for Archive {
    fn subscribe(methods: &mut Methods<Self>) {
        methods.on("store", Subscribe::new(ThreadMode::Async), |_: &Archive, f: &Finished| {
            if f.bytes == 0 {
                return Err("nothing to archive");
            }
            thread::sleep(Duration::from_millis(20));
            println!("[archive] stored {} bytes on {:?}", f.bytes, thread::current().name());
            Ok(())
        });
    }

    fn name(&self) -> &'static str {
        "archive"
    }
}

/// Prints callback failures.
struct Alerts;

impl Subscriber for Alerts {
    fn subscribe(methods: &mut Methods<Self>) {
        methods.on("on_failure", Subscribe::posting(), |_: &Alerts, ev: &SubscriberFailed| {
            println!("[alert] {}::{} failed: {}", ev.subscriber, ev.method, ev.error);
        });
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (main_loop, driver) = MainLoop::new();
    let bus = Bus::builder(Config::default())
        .with_main_thread(Arc::new(main_loop))
        .build();

    #[cfg(feature = "logging")]
    bus.register(&Arc::new(eventline::LogWriter))?;

    // Theme is set before any screen exists.
    bus.post_sticky(Theme("dark"));

    let stop = CancellationToken::new();
    let audit = Arc::new(Audit::default());
    bus.register(&Arc::new(Alerts))?;
    bus.register(&audit)?;
    bus.register(&Arc::new(Archive))?;
    let screen = Arc::new(Screen { stop: stop.clone() });
    let registration = bus.register(&screen)?.into_result()?;
    println!(
        "[main] screen registered: {} callbacks, {} sticky replayed",
        registration.added(),
        registration.sticky_delivered()
    );

    let worker = {
        let bus = bus.clone();
        thread::Builder::new().name("downloader".into()).spawn(move || {
            for pct in (0..=100).step_by(25) {
                bus.post(Progress(pct));
                thread::sleep(Duration::from_millis(10));
            }
            bus.post(Finished { bytes: 0 });
            bus.post(Finished { bytes: 4096 });
        })?
    };

    // This thread is the main thread from here on.
    driver.run(stop).await;

    worker.join().map_err(|_| "downloader panicked")?;
    bus.unregister(&screen);
    println!("[main] audit saw {} updates", audit.seen.load(Ordering::Relaxed));

    // Give the archive a moment before the pool goes away.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
