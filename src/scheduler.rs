use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A job re-run on a fixed period on its own thread.
///
/// Dropping the ticker stops it; an in-flight run finishes first.
pub struct Ticker {
    name: &'static str,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(
        name: &'static str,
        period: Duration,
        fire_immediately: bool,
        mut job: F,
    ) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            if fire_immediately {
                job();
            }
            loop {
                match stopped.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => job(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;
        log::debug!("Started {name} every {period:?}");

        Ok(Self {
            name,
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("{} timer thread panicked", self.name);
            }
        }
    }
}
