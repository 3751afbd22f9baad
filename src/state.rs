use crate::collector::DayCollector;
use crate::settings::Settings;
use crate::tasks::TaskQueue;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub collector: Arc<dyn DayCollector>,
    /// One browser run at a time.
    pub run_lock: Arc<Mutex<()>>,
    pub tasks: TaskQueue,
}

impl AppState {
    /// Must be called inside a tokio runtime; spawns the task worker.
    pub fn new(settings: Arc<Settings>, collector: Arc<dyn DayCollector>) -> Self {
        let run_lock = Arc::new(Mutex::new(()));
        let tasks = TaskQueue::spawn(collector.clone(), run_lock.clone(), settings.start_weight);
        Self {
            settings,
            collector,
            run_lock,
            tasks,
        }
    }
}
