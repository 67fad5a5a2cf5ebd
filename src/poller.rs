use crate::backend::BackendClient;
use crate::types::AllocationsMap;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

struct Schedule {
    /// Bumped on every activation and deactivation; a poll only lands if its epoch is current.
    epoch: u64,
    active: bool,
    allocations: AllocationsMap,
    task: Option<JoinHandle<()>>,
}

/// Live view toggle plus the allocation poller behind it.
pub struct LiveView {
    backend: BackendClient,
    period: Duration,
    schedule: Arc<Mutex<Schedule>>,
}

impl LiveView {
    pub fn new(backend: BackendClient, period: Duration) -> Self {
        LiveView {
            backend,
            period,
            schedule: Arc::new(Mutex::new(Schedule {
                epoch: 0,
                active: false,
                allocations: AllocationsMap::new(),
                task: None,
            })),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn is_active(&self) -> bool {
        self.schedule.lock().await.active
    }

    /// Last successfully fetched map. Kept across failed polls and toggles.
    pub async fn allocations(&self) -> AllocationsMap {
        self.schedule.lock().await.allocations.clone()
    }

    /// Starts a fresh schedule: one fetch now, then one per period.
    pub async fn activate(&self) {
        let mut schedule = self.schedule.lock().await;
        if !schedule.active {
            self.start(&mut schedule);
        }
    }

    /// Stops polling. A fetch still in flight is aborted and its result never applied.
    pub async fn deactivate(&self) {
        let mut schedule = self.schedule.lock().await;
        if schedule.active {
            stop(&mut schedule);
        }
    }

    /// Flips the live view and returns whether it is now on.
    pub async fn toggle(&self) -> bool {
        let mut schedule = self.schedule.lock().await;
        if schedule.active {
            stop(&mut schedule);
        } else {
            self.start(&mut schedule);
        }
        schedule.active
    }

    fn start(&self, schedule: &mut Schedule) {
        schedule.epoch += 1;
        schedule.active = true;
        info!("Live view on; polling allocations every {:?}", self.period);
        schedule.task = Some(tokio::spawn(poll(
            self.backend.clone(),
            self.period,
            self.schedule.clone(),
            schedule.epoch,
        )));
    }
}

fn stop(schedule: &mut Schedule) {
    schedule.epoch += 1;
    schedule.active = false;
    if let Some(task) = schedule.task.take() {
        task.abort();
    }
    info!("Live view off");
}

async fn poll(
    backend: BackendClient,
    period: Duration,
    schedule: Arc<Mutex<Schedule>>,
    epoch: u64,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match backend.allocations().await {
            Ok(allocations) => {
                let mut schedule = schedule.lock().await;
                if schedule.epoch != epoch {
                    debug!("Dropping allocations fetched under stale epoch {}", epoch);
                    return;
                }
                debug!("Fetched {} allocations", allocations.len());
                schedule.allocations = allocations;
            }
            Err(e) => error!("Error fetching allocations: {}", e),
        }
    }
}
