//! Host implementations of the platform primitives.
//!
//! Lets the HAL, app layer and samples run as an ordinary process: the
//! one-shot timer is a tokio task, the cooperative work context is a
//! dedicated thread, and the radio interrupt line is a software line that
//! a radio driver (or a test) triggers. The GNSS LNA is a software switch.

use crate::geolocation::{GeolocationBsp, LnaSwitch, Lr11xxBoardConfig};
use crate::hal::platform::{Clock, IrqHandler, Job, OneShotTimer, Platform, RadioBoard, SystemControl, WorkQueue};
use crate::runner::WakeSignal;
use log::{debug, error, info, warn};
use rand_core::OsRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Exit status used for a cold reboot, so a supervisor restarts the process.
pub const REBOOT_EXIT_CODE: i32 = 75;

/// Default LR11xx TCXO startup delay on the EVK.
pub const DEFAULT_TCXO_STARTUP_DELAY_MS: u32 = 5;

/// Uptime since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// One-shot timer backed by a tokio sleep task.
pub struct TokioTimer {
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TokioTimer {
    /// Create a timer on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            task: Mutex::new(None),
        }
    }

    fn replace(&self, task: Option<JoinHandle<()>>) {
        let previous = std::mem::replace(
            &mut *self.task.lock().unwrap_or_else(|p| p.into_inner()),
            task,
        );
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl OneShotTimer for TokioTimer {
    fn start(&self, after: Duration, on_expiry: Job) {
        // Abort before spawning so two armings never coexist.
        self.replace(None);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            on_expiry();
        });
        self.replace(Some(task));
    }

    fn stop(&self) {
        self.replace(None);
    }
}

/// Cooperative work context: a dedicated thread running jobs in order.
pub struct WorkQueueThread {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl WorkQueueThread {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
                debug!("Work queue drained, thread exiting");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Stop accepting jobs and wait for the queued ones to finish.
    pub fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(|p| p.into_inner()).take();
        let thread = self.thread.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                error!("Work queue thread panicked");
            }
        }
    }
}

impl WorkQueue for WorkQueueThread {
    fn submit(&self, job: Job) {
        let sender = self.sender.lock().unwrap_or_else(|p| p.into_inner());
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(job).is_err() {
                    warn!("Work queue thread gone, job dropped");
                }
            }
            None => warn!("Work queue shut down, job dropped"),
        }
    }
}

impl Drop for WorkQueueThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Software radio interrupt line.
///
/// [`trigger`](Self::trigger) plays the role of an edge on the LR11xx event
/// pin; the attached handler runs on the work queue, like the LR11xx event
/// trigger running in the system work queue.
pub struct SoftIrqLine {
    handler: Mutex<Option<IrqHandler>>,
    enabled: AtomicBool,
    work_queue: Arc<dyn WorkQueue>,
    tcxo_startup_delay_ms: u32,
}

impl SoftIrqLine {
    pub fn new(work_queue: Arc<dyn WorkQueue>, tcxo_startup_delay_ms: u32) -> Self {
        Self {
            handler: Mutex::new(None),
            enabled: AtomicBool::new(false),
            work_queue,
            tcxo_startup_delay_ms,
        }
    }

    /// Raise the line. Ignored while disabled or with no handler attached.
    pub fn trigger(&self) {
        if !self.enabled.load(Ordering::Acquire) {
            debug!("Radio irq while line disabled");
            return;
        }
        let handler = self.handler.lock().unwrap_or_else(|p| p.into_inner()).clone();
        if let Some(handler) = handler {
            self.work_queue.submit(Box::new(move || handler()));
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl RadioBoard for SoftIrqLine {
    fn attach_interrupt(&self, handler: IrqHandler) {
        *self.handler.lock().unwrap_or_else(|p| p.into_inner()) = Some(handler);
    }

    fn enable_interrupt(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    fn disable_interrupt(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn tcxo_startup_delay_ms(&self) -> u32 {
        self.tcxo_startup_delay_ms
    }
}

/// Software GNSS LNA enable line.
#[derive(Debug, Default)]
pub struct SoftLna {
    on: AtomicBool,
}

impl SoftLna {
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }
}

impl LnaSwitch for SoftLna {
    fn set_lna(&self, on: bool) {
        debug!("LNA {}", if on { "on" } else { "off" });
        self.on.store(on, Ordering::Release);
    }
}

/// Reboot by exiting the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessControl;

impl SystemControl for ProcessControl {
    fn reboot_cold(&self) -> ! {
        warn!("Cold reboot");
        log::logger().flush();
        // Leave time for the log sink to drain.
        thread::sleep(Duration::from_secs(1));
        std::process::exit(REBOOT_EXIT_CODE)
    }
}

/// Host platform plus handles a radio driver needs.
pub struct HostPlatform {
    pub platform: Platform,
    pub irq_line: Arc<SoftIrqLine>,
    pub work_queue: Arc<WorkQueueThread>,
    pub lna: Arc<SoftLna>,
    /// Board hooks for the modem library's geolocation services.
    pub geolocation: GeolocationBsp,
}

impl HostPlatform {
    /// Assemble the host platform on the current tokio runtime.
    pub fn new(tcxo_startup_delay_ms: u32) -> std::io::Result<Self> {
        let work_queue = Arc::new(WorkQueueThread::spawn("modem-workq")?);
        let irq_line = Arc::new(SoftIrqLine::new(work_queue.clone(), tcxo_startup_delay_ms));
        let lna = Arc::new(SoftLna::default());
        let geolocation = GeolocationBsp::new(
            lna.clone(),
            Lr11xxBoardConfig {
                tcxo_startup_delay_ms,
                ..Lr11xxBoardConfig::default()
            },
        );

        let platform = Platform {
            clock: Arc::new(MonotonicClock::new()),
            timer: Arc::new(TokioTimer::new()),
            work_queue: work_queue.clone(),
            board: irq_line.clone(),
            system: Arc::new(ProcessControl),
            rng: Box::new(OsRng),
            wake: WakeSignal::new(),
        };
        info!("Host platform ready");

        Ok(Self {
            platform,
            irq_line,
            work_queue,
            lna,
            geolocation,
        })
    }
}
