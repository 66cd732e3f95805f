//! 会话运行时
//!
//! 持有 [`SessionEngine`]，执行引擎返回的副作用：每个副作用一个 tokio 任务，
//! 结果通过无界通道回到引擎。引擎只在运行时所在的任务里被修改。
//! 协作方调用放在内层任务里执行，内层任务 panic 时同样回报失败结果，
//! 在途计数和摘要标记不会悬挂。

use chrono::NaiveDate;
use healthbridge_integration::{MediaDevices, MediaError, Summarizer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::call::CallId;
use crate::command::{Command, Effect, Outcome};
use crate::engine::SessionEngine;
use crate::navigation::{route, Screen};

/// 通话计时粒度
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// 会话运行时
pub struct SessionRuntime {
    engine: SessionEngine,
    summarizer: Arc<dyn Summarizer>,
    media: Arc<dyn MediaDevices>,
    tick_interval: Duration,
    outcome_tx: UnboundedSender<Outcome>,
    outcome_rx: UnboundedReceiver<Outcome>,
    clocks: HashMap<CallId, JoinHandle<()>>,
    in_flight: usize,
}

impl SessionRuntime {
    pub fn new(engine: SessionEngine, summarizer: Arc<dyn Summarizer>, media: Arc<dyn MediaDevices>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            summarizer,
            media,
            tick_interval: DEFAULT_TICK_INTERVAL,
            outcome_tx,
            outcome_rx,
            clocks: HashMap::new(),
            in_flight: 0,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// 宿主程序直接访问引擎（例如推进预约状态）
    pub fn engine_mut(&mut self) -> &mut SessionEngine {
        &mut self.engine
    }

    pub fn screen(&self, today: NaiveDate) -> Screen {
        route(&self.engine, today)
    }

    /// 尚未返回结果的一次性副作用数量
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// 执行启动副作用（启动画面计时）
    pub fn start(&mut self) {
        info!("Starting session runtime");
        let effects = self.engine.boot();
        self.execute(effects);
    }

    /// 提交用户命令
    pub fn dispatch(&mut self, command: Command) {
        let effects = self.engine.apply(command);
        self.execute(effects);
    }

    /// 等待并处理下一个结果
    pub async fn next_outcome(&mut self) -> bool {
        match self.outcome_rx.recv().await {
            Some(outcome) => {
                self.handle(outcome);
                true
            }
            None => false,
        }
    }

    /// 处理所有已到达的结果，不等待
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.handle(outcome);
            handled += 1;
        }
        handled
    }

    /// 等待全部一次性副作用完成；期间到达的计时心跳照常处理
    pub async fn settle_all(&mut self) {
        while self.in_flight > 0 {
            if !self.next_outcome().await {
                break;
            }
        }
    }

    fn handle(&mut self, outcome: Outcome) {
        if outcome.is_one_shot() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        let effects = self.engine.settle(outcome);
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            debug!("Executing effect {:?}", effect);
            match effect {
                Effect::ScheduleSplash(delay) => {
                    self.in_flight += 1;
                    let tx = self.outcome_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        deliver(&tx, Outcome::SplashElapsed);
                    });
                }
                Effect::RequestSummary { record_id, content } => {
                    self.in_flight += 1;
                    let tx = self.outcome_tx.clone();
                    let summarizer = Arc::clone(&self.summarizer);
                    let task = tokio::spawn(async move {
                        summarizer.summarize(&content).await.map_err(|e| e.to_string())
                    });
                    tokio::spawn(async move {
                        let result = task.await.unwrap_or_else(|e| {
                            error!("Summarizer task for {} failed: {}", record_id, e);
                            Err(format!("summarizer task failed: {}", e))
                        });
                        deliver(&tx, Outcome::SummaryFinished { record_id, result });
                    });
                }
                Effect::AcquireMedia { call_id, constraints } => {
                    self.in_flight += 1;
                    let tx = self.outcome_tx.clone();
                    let media = Arc::clone(&self.media);
                    let task = tokio::spawn(async move { media.acquire(&constraints).await });
                    tokio::spawn(async move {
                        let result = task.await.unwrap_or_else(|e| {
                            error!("Media task for call {} failed: {}", call_id, e);
                            Err(MediaError::Other(format!("Could not access camera or microphone: {}", e)))
                        });
                        deliver(&tx, Outcome::MediaAcquired { call_id, result });
                    });
                }
                Effect::StartClock { call_id } => {
                    let tx = self.outcome_tx.clone();
                    let period = self.tick_interval;
                    let handle = tokio::spawn(async move {
                        let start = tokio::time::Instant::now() + period;
                        let mut interval = tokio::time::interval_at(start, period);
                        loop {
                            interval.tick().await;
                            if tx.send(Outcome::ClockTick { call_id }).is_err() {
                                break;
                            }
                        }
                    });
                    if let Some(previous) = self.clocks.insert(call_id, handle) {
                        previous.abort();
                    }
                }
                Effect::StopClock { call_id } => {
                    if let Some(handle) = self.clocks.remove(&call_id) {
                        handle.abort();
                        debug!("Clock for call {} stopped", call_id);
                    }
                }
            }
        }
    }
}

/// 投递结果；运行时已关闭时释放随结果返回的设备流
fn deliver(tx: &UnboundedSender<Outcome>, outcome: Outcome) {
    if let Err(SendError(outcome)) = tx.send(outcome) {
        release_undelivered(outcome);
    }
}

fn release_undelivered(outcome: Outcome) {
    if let Outcome::MediaAcquired {
        call_id,
        result: Ok(mut stream),
    } = outcome
    {
        warn!("Runtime gone, releasing stream for call {}", call_id);
        stream.release_all();
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        for (_, handle) in self.clocks.drain() {
            handle.abort();
        }
        self.outcome_rx.close();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            release_undelivered(outcome);
        }
    }
}
