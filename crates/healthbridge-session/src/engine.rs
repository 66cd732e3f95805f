//! 会话引擎
//!
//! 协调身份、预约、病历和通话会话的单一状态聚合。所有修改都通过 [`Command`] 或
//! [`Outcome`] 进入，引擎本身是同步且确定的，异步工作以 [`Effect`] 的形式交给运行时。

use healthbridge_core::{IdGenerator, Identity};
use healthbridge_integration::MediaConstraints;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::appointments::{AppointmentStore, BookingRequest};
use crate::auth::SessionManager;
use crate::call::{CallId, CallSession};
use crate::command::{Command, Effect, Outcome};
use crate::directory::DoctorDirectory;
use crate::navigation::Tab;
use crate::records::RecordStore;
use crate::seed::{sample_appointments, sample_records};

/// 默认启动画面时长
pub const DEFAULT_SPLASH_DELAY: Duration = Duration::from_millis(2500);

/// 会话引擎
pub struct SessionEngine {
    session: SessionManager,
    appointments: AppointmentStore,
    records: RecordStore,
    directory: DoctorDirectory,
    active_tab: Tab,
    default_tab: Tab,
    call: Option<CallSession>,
    next_call_id: CallId,
    ids: Box<dyn IdGenerator>,
    constraints: MediaConstraints,
    splash_delay: Duration,
}

impl SessionEngine {
    /// 使用内置示例数据创建引擎
    pub fn new(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            session: SessionManager::new(),
            appointments: AppointmentStore::with_appointments(sample_appointments()),
            records: RecordStore::new(sample_records()),
            directory: DoctorDirectory::with_defaults(),
            active_tab: Tab::Dashboard,
            default_tab: Tab::Dashboard,
            call: None,
            next_call_id: 1,
            ids,
            constraints: MediaConstraints::default(),
            splash_delay: DEFAULT_SPLASH_DELAY,
        }
    }

    pub fn with_appointments(mut self, appointments: AppointmentStore) -> Self {
        self.appointments = appointments;
        self
    }

    pub fn with_records(mut self, records: RecordStore) -> Self {
        self.records = records;
        self
    }

    pub fn with_directory(mut self, directory: DoctorDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_media_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_splash_delay(mut self, delay: Duration) -> Self {
        self.splash_delay = delay;
        self
    }

    /// 登录后和退出后落到的标签页
    pub fn with_default_tab(mut self, tab: Tab) -> Self {
        self.default_tab = tab;
        self.active_tab = tab;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity()
    }

    pub fn appointments(&self) -> &AppointmentStore {
        &self.appointments
    }

    /// 预约仓库的可变引用，供宿主程序直接推进预约状态
    pub fn appointments_mut(&mut self) -> &mut AppointmentStore {
        &mut self.appointments
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn directory(&self) -> &DoctorDirectory {
        &self.directory
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn call(&self) -> Option<&CallSession> {
        self.call.as_ref()
    }

    /// 启动时需要执行的副作用
    pub fn boot(&self) -> Vec<Effect> {
        vec![Effect::ScheduleSplash(self.splash_delay)]
    }

    /// 处理用户命令
    pub fn apply(&mut self, command: Command) -> Vec<Effect> {
        debug!("Applying command {:?}", command);
        match command {
            Command::SelectRole(role) => {
                self.session.select_role(role);
                Vec::new()
            }
            Command::BackToLogin => {
                self.session.back_to_login();
                Vec::new()
            }
            Command::CompleteSignUp { name, email } => {
                if self.session.complete_sign_up(&name, &email, self.ids.as_mut()).is_some() {
                    self.active_tab = self.default_tab;
                }
                Vec::new()
            }
            Command::SignOut => self.sign_out(),
            command if !self.session.is_authenticated() => {
                debug!("Ignoring {:?} without an authenticated session", command);
                Vec::new()
            }
            Command::SetActiveTab(tab) => {
                self.active_tab = tab;
                Vec::new()
            }
            Command::BookAppointment { doctor_id, date, time } => {
                self.book(BookingRequest { doctor_id, date, time });
                Vec::new()
            }
            Command::Summarize { record_id } => self.summarize(&record_id),
            Command::StartCall { appointment_id } => self.start_call(&appointment_id),
            Command::RetryMedia => self.retry_media(),
            Command::ToggleAudio => {
                if let Some(call) = self.call.as_mut() {
                    call.toggle_audio();
                }
                Vec::new()
            }
            Command::ToggleVideo => {
                if let Some(call) = self.call.as_mut() {
                    call.toggle_video();
                }
                Vec::new()
            }
            Command::EndCall => self.end_call(),
        }
    }

    /// 处理副作用的结果
    pub fn settle(&mut self, outcome: Outcome) -> Vec<Effect> {
        match outcome {
            Outcome::SplashElapsed => {
                self.session.finish_splash();
            }
            Outcome::SummaryFinished { record_id, result } => {
                self.records.complete_summary(&record_id, result);
            }
            Outcome::MediaAcquired { call_id, result } => {
                let current = self.call.as_mut().filter(|call| call.id() == call_id);
                match (current, result) {
                    (Some(call), Ok(stream)) => {
                        if let Some(mut leftover) = call.on_acquired(stream) {
                            leftover.release_all();
                        }
                    }
                    (Some(call), Err(error)) => call.on_failed(&error),
                    (None, Ok(mut stream)) => {
                        warn!("Releasing stream for stale call {}", call_id);
                        stream.release_all();
                    }
                    (None, Err(error)) => {
                        debug!("Ignoring media error for stale call {}: {}", call_id, error);
                    }
                }
            }
            Outcome::ClockTick { call_id } => {
                if let Some(call) = self.call.as_mut().filter(|call| call.id() == call_id) {
                    call.tick();
                }
            }
        }
        Vec::new()
    }

    fn sign_out(&mut self) -> Vec<Effect> {
        let effects = self.end_call();
        if self.session.sign_out().is_some() {
            self.active_tab = self.default_tab;
        }
        effects
    }

    fn book(&mut self, request: BookingRequest) {
        let patient_id = match self.session.identity() {
            Some(identity) => identity.id.clone(),
            None => return,
        };
        if !self.directory.contains(&request.doctor_id) {
            warn!("Booking references unknown doctor {}", request.doctor_id);
        }
        if self.appointments.book(&request, &patient_id, self.ids.as_mut()).is_some() {
            self.active_tab = Tab::Appointments;
        }
    }

    fn summarize(&mut self, record_id: &str) -> Vec<Effect> {
        match self.records.begin_summary(record_id) {
            Ok(Some(content)) => vec![Effect::RequestSummary {
                record_id: record_id.to_string(),
                content,
            }],
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Cannot summarize: {}", e);
                Vec::new()
            }
        }
    }

    fn start_call(&mut self, appointment_id: &str) -> Vec<Effect> {
        if let Some(call) = &self.call {
            debug!("Call {} already active, ignoring new call request", call.id());
            return Vec::new();
        }
        match self.appointments.get(appointment_id) {
            Some(apt) if apt.status == healthbridge_core::AppointmentStatus::Scheduled => {}
            Some(apt) => {
                warn!("Cannot join appointment {} in status {}", appointment_id, apt.status);
                return Vec::new();
            }
            None => {
                warn!("Cannot join unknown appointment {}", appointment_id);
                return Vec::new();
            }
        }

        let call_id = self.next_call_id;
        self.next_call_id += 1;
        let mut call = CallSession::new(call_id, appointment_id);
        call.start();
        self.call = Some(call);
        info!("Call {} created for appointment {}", call_id, appointment_id);

        vec![
            Effect::StartClock { call_id },
            Effect::AcquireMedia {
                call_id,
                constraints: self.constraints,
            },
        ]
    }

    fn retry_media(&mut self) -> Vec<Effect> {
        let Some(call) = self.call.as_mut() else {
            return Vec::new();
        };
        if !call.retry() {
            return Vec::new();
        }
        vec![Effect::AcquireMedia {
            call_id: call.id(),
            constraints: self.constraints,
        }]
    }

    fn end_call(&mut self) -> Vec<Effect> {
        match self.call.take() {
            Some(mut call) => {
                let call_id = call.id();
                call.teardown();
                vec![Effect::StopClock { call_id }]
            }
            None => Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn attach_call(&mut self, call: CallSession) {
        self.call = Some(call);
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("session", &self.session)
            .field("appointments", &self.appointments.len())
            .field("active_tab", &self.active_tab)
            .field("call", &self.call)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallPhase;
    use crate::navigation::{route, Screen};
    use chrono::NaiveDate;
    use healthbridge_core::{AppointmentStatus, AppointmentType, SequentialIdGenerator, UserRole};
    use healthbridge_integration::{
        MediaDevices, MediaError, SimulatedMediaDevices, SimulationMode, SUMMARY_FALLBACK,
    };

    fn engine() -> SessionEngine {
        SessionEngine::new(Box::new(SequentialIdGenerator::new("id")))
    }

    fn signed_in(role: UserRole) -> SessionEngine {
        let mut engine = engine();
        engine.settle(Outcome::SplashElapsed);
        engine.apply(Command::SelectRole(role));
        engine.apply(Command::CompleteSignUp {
            name: "Alex Kim".to_string(),
            email: "alex@example.com".to_string(),
        });
        engine
    }

    #[test]
    fn test_boot_schedules_splash() {
        let engine = engine().with_splash_delay(Duration::from_millis(10));
        assert_eq!(engine.boot(), vec![Effect::ScheduleSplash(Duration::from_millis(10))]);
    }

    #[test]
    fn test_commands_ignored_before_sign_in() {
        let mut engine = engine();
        engine.settle(Outcome::SplashElapsed);

        assert!(engine
            .apply(Command::Summarize { record_id: "rec1".to_string() })
            .is_empty());
        assert!(engine
            .apply(Command::StartCall { appointment_id: "apt1".to_string() })
            .is_empty());
        assert!(engine.call().is_none());
        assert!(!engine.records().is_in_flight("rec1"));
    }

    #[test]
    fn test_doctor_sign_up_scenario() {
        let engine = signed_in(UserRole::Doctor);
        let identity = engine.identity().unwrap();
        assert_eq!(identity.role, UserRole::Doctor);
        assert!(!identity.specialty.as_deref().unwrap_or_default().is_empty());
        assert_eq!(identity.id, "id1");
    }

    #[test]
    fn test_booking_scenario_switches_tab() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::BookAppointment {
            doctor_id: "doc2".to_string(),
            date: "2024-10-25".to_string(),
            time: "14:00".to_string(),
        });

        let newest = &engine.appointments().all()[0];
        assert_eq!(newest.status, AppointmentStatus::Scheduled);
        assert_eq!(newest.appointment_type, AppointmentType::Video);
        assert_eq!(newest.display_date(), "Oct 25, 2024");
        assert_eq!(newest.patient_id, "id1");
        assert_eq!(engine.active_tab(), Tab::Appointments);
    }

    #[test]
    fn test_skipped_booking_keeps_tab() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::BookAppointment {
            doctor_id: "doc2".to_string(),
            date: String::new(),
            time: "14:00".to_string(),
        });
        assert_eq!(engine.appointments().len(), 2);
        assert_eq!(engine.active_tab(), Tab::Dashboard);
    }

    #[test]
    fn test_summarize_single_flight() {
        let mut engine = signed_in(UserRole::Patient);

        let first = engine.apply(Command::Summarize { record_id: "rec1".to_string() });
        let second = engine.apply(Command::Summarize { record_id: "rec1".to_string() });
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());

        engine.settle(Outcome::SummaryFinished {
            record_id: "rec1".to_string(),
            result: Err("network down".to_string()),
        });
        assert_eq!(engine.records().summary("rec1"), Some(SUMMARY_FALLBACK));
        assert!(!engine.records().is_in_flight("rec1"));

        // 失败后可以重新摘要
        assert_eq!(engine.apply(Command::Summarize { record_id: "rec1".to_string() }).len(), 1);
    }

    #[test]
    fn test_second_start_does_not_reacquire() {
        let mut engine = signed_in(UserRole::Patient);
        let effects = engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });
        let acquisitions = effects
            .iter()
            .filter(|e| matches!(e, Effect::AcquireMedia { .. }))
            .count();
        assert_eq!(acquisitions, 1);

        assert!(engine
            .apply(Command::StartCall { appointment_id: "apt1".to_string() })
            .is_empty());
        assert!(engine.apply(Command::RetryMedia).is_empty());
    }

    #[test]
    fn test_cannot_join_completed_appointment() {
        let mut engine = signed_in(UserRole::Patient);
        assert!(engine
            .apply(Command::StartCall { appointment_id: "apt2".to_string() })
            .is_empty());
        assert!(engine
            .apply(Command::StartCall { appointment_id: "nope".to_string() })
            .is_empty());
        assert!(engine.call().is_none());
    }

    #[test]
    fn test_permission_denied_then_retry() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });
        engine.settle(Outcome::MediaAcquired {
            call_id: 1,
            result: Err(MediaError::PermissionDenied("permission denied".to_string())),
        });
        engine.settle(Outcome::ClockTick { call_id: 1 });

        let call = engine.call().unwrap();
        assert_eq!(
            call.phase(),
            &CallPhase::Degraded {
                error: "permission denied".to_string()
            }
        );
        assert!(call.elapsed_seconds() > 0);

        let effects = engine.apply(Command::RetryMedia);
        assert!(matches!(effects[..], [Effect::AcquireMedia { call_id: 1, .. }]));
        assert_eq!(engine.call().unwrap().phase(), &CallPhase::Acquiring);
    }

    #[tokio::test]
    async fn test_end_call_releases_stream() {
        let devices = SimulatedMediaDevices::new(SimulationMode::Available);
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });

        let stream = devices.acquire(&MediaConstraints::default()).await;
        engine.settle(Outcome::MediaAcquired { call_id: 1, result: stream });
        engine.apply(Command::ToggleAudio);
        let probe = devices.last_stream().unwrap();
        assert_eq!(probe.enabled_tracks(), 1);

        let effects = engine.apply(Command::EndCall);
        assert_eq!(effects, vec![Effect::StopClock { call_id: 1 }]);
        assert_eq!(probe.enabled_tracks(), 0);
        assert_eq!(probe.release_calls(), 1);
        assert!(engine.call().is_none());
    }

    #[test]
    fn test_end_degraded_call_without_stream() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });
        engine.settle(Outcome::MediaAcquired {
            call_id: 1,
            result: Err(MediaError::DeviceNotFound),
        });
        assert_eq!(engine.apply(Command::EndCall), vec![Effect::StopClock { call_id: 1 }]);
        assert!(engine.apply(Command::EndCall).is_empty());
    }

    #[tokio::test]
    async fn test_late_stream_is_released() {
        let devices = SimulatedMediaDevices::new(SimulationMode::Available);
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });
        engine.apply(Command::EndCall);

        let stream = devices.acquire(&MediaConstraints::default()).await;
        engine.settle(Outcome::MediaAcquired { call_id: 1, result: stream });
        assert_eq!(devices.last_stream().unwrap().release_calls(), 1);
        assert!(engine.call().is_none());
    }

    #[test]
    fn test_ticks_for_old_call_are_ignored() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });
        engine.apply(Command::EndCall);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });

        engine.settle(Outcome::ClockTick { call_id: 1 });
        assert_eq!(engine.call().unwrap().id(), 2);
        assert_eq!(engine.call().unwrap().elapsed_seconds(), 0);
    }

    #[tokio::test]
    async fn test_sign_out_tears_down_call() {
        let devices = SimulatedMediaDevices::new(SimulationMode::Available);
        let mut engine = signed_in(UserRole::Doctor);
        engine.apply(Command::SetActiveTab(Tab::Records));
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });
        let stream = devices.acquire(&MediaConstraints::default()).await;
        engine.settle(Outcome::MediaAcquired { call_id: 1, result: stream });

        let effects = engine.apply(Command::SignOut);
        assert_eq!(effects, vec![Effect::StopClock { call_id: 1 }]);
        assert_eq!(devices.last_stream().unwrap().enabled_tracks(), 0);
        assert!(engine.identity().is_none());
        assert_eq!(engine.active_tab(), Tab::Dashboard);
    }

    #[test]
    fn test_stale_call_reference_hides_overlay() {
        let mut engine = signed_in(UserRole::Patient);
        let mut call = CallSession::new(7, "deleted-apt");
        call.start();
        engine.attach_call(call);

        let today = NaiveDate::from_ymd_opt(2024, 10, 25).unwrap();
        let Screen::Main(main) = route(&engine, today) else {
            panic!("expected main screen");
        };
        assert!(main.call_overlay.is_none());
    }

    #[test]
    fn test_deterministic_replay() {
        let script = vec![
            Command::SelectRole(UserRole::Patient),
            Command::CompleteSignUp {
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
            },
            Command::BookAppointment {
                doctor_id: "doc3".to_string(),
                date: "2024-11-02".to_string(),
                time: "09:15".to_string(),
            },
            Command::SetActiveTab(Tab::Records),
            Command::Summarize { record_id: "rec2".to_string() },
        ];

        let run = || {
            let mut engine = engine();
            engine.settle(Outcome::SplashElapsed);
            let effects: Vec<Effect> = script.iter().cloned().flat_map(|c| engine.apply(c)).collect();
            let today = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();
            (effects, route(&engine, today))
        };

        assert_eq!(run(), run());
    }
}
