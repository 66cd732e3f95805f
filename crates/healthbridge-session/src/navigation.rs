//! 导航与视图路由
//!
//! [`route`] 是会话状态、当前标签页和通话会话的纯函数，输出当前应展示的界面。

use chrono::NaiveDate;
use healthbridge_core::utils::short_reference;
use healthbridge_core::{
    Appointment, AppointmentStatus, AppointmentType, BridgeError, Doctor, Identity, MedicalRecord,
    RecordType, UserRole,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::{AuthView, SessionPhase};
use crate::call::{CallId, CallPhase};
use crate::directory::DoctorDirectory;
use crate::engine::SessionEngine;

/// 主界面标签页
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Dashboard,
    Appointments,
    Records,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Dashboard, Tab::Appointments, Tab::Records, Tab::Profile];

    pub fn id(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Appointments => "appointments",
            Tab::Records => "records",
            Tab::Profile => "profile",
        }
    }

    /// 底部导航栏上的文字
    pub fn label(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Home",
            Tab::Appointments => "Visits",
            Tab::Records => "History",
            Tab::Profile => "Profile",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tab {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Tab::ALL
            .into_iter()
            .find(|tab| tab.id() == s || tab.label().to_ascii_lowercase() == s)
            .ok_or_else(|| BridgeError::Validation(format!("unknown tab: {}", s)))
    }
}

/// 当前界面
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum Screen {
    Splash,
    Auth(AuthScreen),
    Main(MainScreen),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum AuthScreen {
    Login,
    SignUp { role: UserRole },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MainScreen {
    pub identity: Identity,
    pub tab: Tab,
    pub content: TabContent,
    /// 通话浮层，覆盖在任意标签页之上
    pub call_overlay: Option<CallOverlay>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum TabContent {
    /// 患者/管理员首页：突出下一次预约，没有时展示空状态
    Dashboard { next_appointment: Option<AppointmentCard> },
    /// 医生首页：当天待进行的预约
    DoctorTimeline { date: NaiveDate, appointments: Vec<AppointmentCard> },
    Appointments {
        upcoming: Vec<AppointmentCard>,
        past: Vec<AppointmentCard>,
        doctors: Vec<Doctor>,
    },
    Records { records: Vec<RecordCard> },
    Profile,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentCard {
    pub id: String,
    pub reference: String,
    pub doctor: Option<Doctor>,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
}

impl AppointmentCard {
    fn new(appointment: &Appointment, directory: &DoctorDirectory) -> Self {
        Self {
            id: appointment.id.clone(),
            reference: short_reference(&appointment.id),
            doctor: directory.lookup(&appointment.doctor_id).cloned(),
            date: appointment.display_date(),
            time: appointment.time.clone(),
            status: appointment.status,
            appointment_type: appointment.appointment_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordCard {
    pub id: String,
    pub title: String,
    pub date: String,
    pub record_type: RecordType,
    pub content: String,
    pub summary: Option<String>,
    pub summarizing: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallOverlay {
    pub call_id: CallId,
    pub appointment: AppointmentCard,
    pub phase: CallPhase,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub elapsed: String,
    pub permission_error: Option<String>,
}

/// 计算当前界面
///
/// 通话引用的预约不存在时不渲染通话浮层。
pub fn route(engine: &SessionEngine, today: NaiveDate) -> Screen {
    let identity = match engine.session().phase() {
        SessionPhase::Splash => return Screen::Splash,
        SessionPhase::SignedOut(AuthView::Login) => return Screen::Auth(AuthScreen::Login),
        SessionPhase::SignedOut(AuthView::SignUp) => {
            return Screen::Auth(AuthScreen::SignUp {
                role: engine.session().selected_role(),
            })
        }
        SessionPhase::Authenticated(identity) => identity,
    };

    let tab = engine.active_tab();
    Screen::Main(MainScreen {
        identity: identity.clone(),
        tab,
        content: tab_content(engine, identity, tab, today),
        call_overlay: call_overlay(engine),
    })
}

fn tab_content(engine: &SessionEngine, identity: &Identity, tab: Tab, today: NaiveDate) -> TabContent {
    let directory = engine.directory();
    let appointments = engine.appointments();
    let card = |apt: &Appointment| AppointmentCard::new(apt, directory);

    match tab {
        Tab::Dashboard if identity.role == UserRole::Doctor => TabContent::DoctorTimeline {
            date: today,
            appointments: appointments.scheduled_on(today).into_iter().map(card).collect(),
        },
        Tab::Dashboard => TabContent::Dashboard {
            next_appointment: appointments.next_scheduled().map(card),
        },
        Tab::Appointments => TabContent::Appointments {
            upcoming: appointments.upcoming().into_iter().map(card).collect(),
            past: appointments.past().into_iter().map(card).collect(),
            doctors: directory.all().into_iter().cloned().collect(),
        },
        Tab::Records => {
            let records = engine.records();
            TabContent::Records {
                records: records
                    .list_all()
                    .iter()
                    .map(|record: &MedicalRecord| RecordCard {
                        id: record.id.clone(),
                        title: record.title.clone(),
                        date: record.display_date(),
                        record_type: record.record_type,
                        content: record.content.clone(),
                        summary: records.summary(&record.id).map(str::to_string),
                        summarizing: records.is_in_flight(&record.id),
                    })
                    .collect(),
            }
        }
        Tab::Profile => TabContent::Profile,
    }
}

fn call_overlay(engine: &SessionEngine) -> Option<CallOverlay> {
    let call = engine.call()?;
    let appointment = engine.appointments().get(call.appointment_id())?;

    Some(CallOverlay {
        call_id: call.id(),
        appointment: AppointmentCard::new(appointment, engine.directory()),
        phase: call.phase().clone(),
        audio_enabled: call.audio_enabled(),
        video_enabled: call.video_enabled(),
        elapsed: call.elapsed_label(),
        permission_error: call.permission_error().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Outcome};
    use crate::engine::SessionEngine;
    use healthbridge_core::SequentialIdGenerator;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 25).unwrap()
    }

    fn signed_in(role: UserRole) -> SessionEngine {
        let mut engine = SessionEngine::new(Box::new(SequentialIdGenerator::new("id")));
        engine.settle(Outcome::SplashElapsed);
        engine.apply(Command::SelectRole(role));
        engine.apply(Command::CompleteSignUp {
            name: "Alex Kim".to_string(),
            email: "alex@example.com".to_string(),
        });
        engine
    }

    #[test]
    fn test_tab_parsing() {
        assert_eq!("records".parse::<Tab>().unwrap(), Tab::Records);
        assert_eq!("Visits".parse::<Tab>().unwrap(), Tab::Appointments);
        assert!("settings".parse::<Tab>().is_err());
    }

    #[test]
    fn test_auth_screens() {
        let mut engine = SessionEngine::new(Box::new(SequentialIdGenerator::new("id")));
        assert_eq!(route(&engine, today()), Screen::Splash);

        engine.settle(Outcome::SplashElapsed);
        assert_eq!(route(&engine, today()), Screen::Auth(AuthScreen::Login));

        engine.apply(Command::SelectRole(UserRole::Doctor));
        assert_eq!(
            route(&engine, today()),
            Screen::Auth(AuthScreen::SignUp { role: UserRole::Doctor })
        );
    }

    #[test]
    fn test_doctor_sees_todays_timeline() {
        let engine = signed_in(UserRole::Doctor);
        let Screen::Main(main) = route(&engine, today()) else {
            panic!("expected main screen");
        };
        match main.content {
            TabContent::DoctorTimeline { appointments, .. } => {
                assert_eq!(appointments.len(), 1);
                assert_eq!(appointments[0].reference, "#PX-APT1");
            }
            other => panic!("unexpected content {:?}", other),
        }

        let Screen::Main(main) = route(&engine, today().succ_opt().unwrap()) else {
            panic!("expected main screen");
        };
        assert!(matches!(main.content, TabContent::DoctorTimeline { ref appointments, .. } if appointments.is_empty()));
    }

    #[test]
    fn test_patient_dashboard_highlights_next() {
        let engine = signed_in(UserRole::Patient);
        let Screen::Main(main) = route(&engine, today()) else {
            panic!("expected main screen");
        };
        match main.content {
            TabContent::Dashboard { next_appointment } => {
                let next = next_appointment.unwrap();
                assert_eq!(next.id, "apt1");
                assert_eq!(next.doctor.unwrap().name, "Dr. Sarah Wilson");
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_admin_gets_general_dashboard() {
        let engine = signed_in(UserRole::Admin);
        let Screen::Main(main) = route(&engine, today()) else {
            panic!("expected main screen");
        };
        assert!(matches!(main.content, TabContent::Dashboard { .. }));
    }

    #[test]
    fn test_records_tab_shows_summary_state() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::SetActiveTab(Tab::Records));
        engine.apply(Command::Summarize { record_id: "rec1".to_string() });

        let Screen::Main(main) = route(&engine, today()) else {
            panic!("expected main screen");
        };
        let TabContent::Records { records } = main.content else {
            panic!("expected records");
        };
        assert!(records[0].summarizing);
        assert!(records[0].summary.is_none());
        assert!(!records[1].summarizing);
    }

    #[test]
    fn test_overlay_follows_call() {
        let mut engine = signed_in(UserRole::Patient);
        engine.apply(Command::StartCall { appointment_id: "apt1".to_string() });

        let Screen::Main(main) = route(&engine, today()) else {
            panic!("expected main screen");
        };
        let overlay = main.call_overlay.unwrap();
        assert_eq!(overlay.phase, CallPhase::Acquiring);
        assert_eq!(overlay.elapsed, "0:00");
        assert_eq!(overlay.appointment.doctor.unwrap().specialty, "General Practitioner");

        engine.apply(Command::EndCall);
        let Screen::Main(main) = route(&engine, today()) else {
            panic!("expected main screen");
        };
        assert!(main.call_overlay.is_none());
    }
}
