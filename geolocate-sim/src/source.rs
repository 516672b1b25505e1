use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use geolocate_logic::{
    EventSink, LocationError, LocationSource, Position, PositionOptions, WatchId,
};
use log::{debug, warn};
use tokio::{task::JoinHandle, time::sleep};

use crate::script::{Script, ScriptStep, StepOutcome};

type LastFix = Arc<Mutex<Option<Position>>>;

/// Location source that plays back a [Script] on tokio tasks, standing in for a device's
/// location API.
pub struct ScriptedLocationSource {
    script: Arc<Script>,
    watches: HashMap<WatchId, JoinHandle<()>>,
    queries: Vec<JoinHandle<()>>,
    next_id: u32,
    last_fix: LastFix,
}

impl ScriptedLocationSource {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
            watches: HashMap::new(),
            queries: Vec::new(),
            next_id: 0,
            last_fix: LastFix::default(),
        }
    }

    pub fn active_watches(&self) -> usize {
        self.watches.values().filter(|h| !h.is_finished()).count()
    }

    fn cached_fix(&self, options: PositionOptions) -> Option<Position> {
        if options.maximum_age_ms == 0 {
            return None;
        }
        let last = self.last_fix.lock().ok().and_then(|last| *last)?;
        (last.age(Utc::now()) <= options.maximum_age()).then_some(last)
    }
}

/// Wait for and report one step, returns false once nobody is listening anymore
async fn play_step(
    step: &ScriptStep,
    options: PositionOptions,
    sink: &EventSink,
    last_fix: &LastFix,
) -> bool {
    if sink.is_closed() {
        return false;
    }

    let timeout = options.timeout();
    if step.delay() > timeout {
        sleep(timeout).await;
        debug!("Scripted step needs {:?}, timing out after {timeout:?}", step.delay());
        return sink.error(LocationError::TIMEOUT);
    }

    sleep(step.delay()).await;
    match step.outcome {
        StepOutcome::Fix(fix) => {
            let pos = fix.at(Utc::now());
            if let Ok(mut last) = last_fix.lock() {
                *last = Some(pos);
            }
            sink.position(pos)
        }
        StepOutcome::Error(code) => sink.error(code),
    }
}

impl LocationSource for ScriptedLocationSource {
    fn get_current_position(&mut self, options: PositionOptions, sink: EventSink) {
        self.queries.retain(|h| !h.is_finished());

        if let Some(pos) = self.cached_fix(options) {
            debug!("Answering query with cached fix from {}", pos.timestamp);
            sink.position(pos);
            return;
        }

        let Some(step) = self.script.steps.first().copied() else {
            debug!("Script is empty, no position available");
            sink.error(LocationError::POSITION_UNAVAILABLE);
            return;
        };

        let last_fix = self.last_fix.clone();
        self.queries.push(tokio::spawn(async move {
            play_step(&step, options, &sink, &last_fix).await;
        }));
    }

    fn watch_position(&mut self, options: PositionOptions, sink: EventSink) -> WatchId {
        let id = WatchId(self.next_id);
        self.next_id += 1;

        if options.enable_high_accuracy {
            debug!("High accuracy requested for {id:?}, scripted fixes are reported as written");
        }

        let script = self.script.clone();
        let last_fix = self.last_fix.clone();
        let handle = tokio::spawn(async move {
            loop {
                for step in script.steps.iter() {
                    if !play_step(step, options, &sink, &last_fix).await {
                        debug!("Watch {id:?} lost its listener, stopping");
                        return;
                    }
                }
                if !script.repeat || script.steps.is_empty() {
                    break;
                }
                if script.loops_instantly() {
                    warn!("Watch {id:?} script repeats without any delay, not looping it");
                    break;
                }
            }
            debug!("Watch {id:?} reached the end of the script");
        });
        self.watches.insert(id, handle);
        id
    }

    fn clear_watch(&mut self, id: WatchId) {
        if let Some(handle) = self.watches.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for ScriptedLocationSource {
    fn drop(&mut self) {
        for handle in self.watches.values().chain(self.queries.iter()) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptedFix;
    use geolocate_logic::ProviderEvent;
    use std::time::Duration;
    use tokio::{sync::mpsc, time::Instant};

    fn fix(after_ms: u64, lat: f64, long: f64) -> ScriptStep {
        ScriptStep {
            after_ms,
            outcome: StepOutcome::Fix(ScriptedFix {
                lat,
                long,
                accuracy: None,
                heading: None,
            }),
        }
    }

    fn error(after_ms: u64, code: u16) -> ScriptStep {
        ScriptStep {
            after_ms,
            outcome: StepOutcome::Error(code),
        }
    }

    fn options(timeout_ms: u64, maximum_age_ms: u64) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: false,
            maximum_age_ms,
            timeout_ms,
        }
    }

    fn coords(event: Option<ProviderEvent>) -> (f64, f64) {
        match event {
            Some(ProviderEvent::Position(pos)) => (pos.lat, pos.long),
            other => panic!("Expected a position, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_plays_in_order() {
        let mut source = ScriptedLocationSource::new(Script {
            repeat: false,
            steps: vec![fix(100, 1.0, 1.0), fix(10_000, 2.0, 2.0), error(50, 1)],
        });
        let (tx, mut rx) = mpsc::unbounded_channel();

        let started = Instant::now();
        source.watch_position(options(5000, 0), EventSink::new(tx));

        assert_eq!(coords(rx.recv().await), (1.0, 1.0));
        assert_eq!(
            rx.recv().await,
            Some(ProviderEvent::Error(LocationError::TIMEOUT)),
            "Slow step should time out"
        );
        assert_eq!(rx.recv().await, Some(ProviderEvent::Error(1)));
        assert_eq!(started.elapsed(), Duration::from_millis(5150));
        assert_eq!(rx.recv().await, None, "Watch should end with the script");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_watch() {
        let mut source = ScriptedLocationSource::new(Script {
            repeat: true,
            steps: vec![fix(100, 1.0, 1.0)],
        });
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = source.watch_position(options(5000, 0), EventSink::new(tx));
        assert_eq!(coords(rx.recv().await), (1.0, 1.0));
        assert_eq!(coords(rx.recv().await), (1.0, 1.0), "Script should repeat");

        source.clear_watch(id);
        assert_eq!(rx.recv().await, None, "Cleared watch kept reporting");
        assert_eq!(source.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_repeat_plays_once() {
        let mut source = ScriptedLocationSource::new(Script {
            repeat: true,
            steps: vec![fix(0, 1.0, 1.0), error(0, 2)],
        });
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.watch_position(options(5000, 0), EventSink::new(tx));

        assert_eq!(coords(rx.recv().await), (1.0, 1.0));
        assert_eq!(rx.recv().await, Some(ProviderEvent::Error(2)));
        assert_eq!(rx.recv().await, None, "Zero delay script kept looping");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_stops_without_listener() {
        let mut source = ScriptedLocationSource::new(Script {
            repeat: true,
            steps: vec![fix(100, 1.0, 1.0)],
        });
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        source.watch_position(options(5000, 0), EventSink::new(tx));
        sleep(Duration::from_millis(10)).await;

        assert_eq!(source.active_watches(), 0, "Watch kept running with nobody listening");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_uses_cache() {
        let mut source = ScriptedLocationSource::new(Script {
            repeat: false,
            steps: vec![fix(200, 3.0, 4.0)],
        });
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.get_current_position(options(5000, 60_000), EventSink::new(tx.clone()));
        assert!(rx.try_recv().is_err(), "Nothing cached yet");
        assert_eq!(coords(rx.recv().await), (3.0, 4.0));

        source.get_current_position(options(5000, 60_000), EventSink::new(tx.clone()));
        assert_eq!(
            coords(rx.try_recv().ok()),
            (3.0, 4.0),
            "Cached fix should come back right away"
        );

        source.get_current_position(options(5000, 0), EventSink::new(tx));
        assert!(rx.try_recv().is_err(), "A maximum age of 0 must not use the cache");
        assert_eq!(coords(rx.recv().await), (3.0, 4.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout() {
        let mut source = ScriptedLocationSource::new(Script {
            repeat: false,
            steps: vec![fix(800, 3.0, 4.0)],
        });
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.get_current_position(options(500, 0), EventSink::new(tx));
        assert_eq!(
            rx.recv().await,
            Some(ProviderEvent::Error(LocationError::TIMEOUT))
        );
    }

    #[tokio::test]
    async fn test_empty_script() {
        let mut source = ScriptedLocationSource::new(Script::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.get_current_position(options(5000, 0), EventSink::new(tx));
        assert_eq!(
            rx.try_recv().ok(),
            Some(ProviderEvent::Error(LocationError::POSITION_UNAVAILABLE))
        );
    }
}
