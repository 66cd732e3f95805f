//! 界面文本渲染

use healthbridge_core::utils::format_display_date;
use healthbridge_integration::TriageAssessment;
use healthbridge_session::{
    AppointmentCard, AuthScreen, CallOverlay, CallPhase, MainScreen, Screen, Tab, TabContent,
};
use std::fmt::Write;

pub fn render_screen(screen: &Screen) -> String {
    let mut out = String::new();
    match screen {
        Screen::Splash => out.push_str("HealthBridge\nConnecting you to care...\n"),
        Screen::Auth(AuthScreen::Login) => {
            out.push_str("Welcome to HealthBridge\n");
            out.push_str("Continue as: role patient | role doctor | role admin\n");
        }
        Screen::Auth(AuthScreen::SignUp { role }) => {
            let _ = writeln!(out, "Create your {} account", role);
            out.push_str("signup <name> <email>   (back to return)\n");
        }
        Screen::Main(main) => render_main(&mut out, main),
    }
    out
}

fn render_main(out: &mut String, main: &MainScreen) {
    let identity = &main.identity;
    let _ = write!(out, "{} <{}> [{}]", identity.name, identity.email, identity.role);
    if let Some(specialty) = &identity.specialty {
        let _ = write!(out, " {}", specialty);
    }
    out.push('\n');

    let tabs: Vec<String> = Tab::ALL
        .iter()
        .map(|tab| {
            if *tab == main.tab {
                format!("[{}]", tab.label())
            } else {
                tab.label().to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join("  "));
    out.push_str("----------------------------------------\n");

    match &main.content {
        TabContent::Dashboard { next_appointment } => match next_appointment {
            Some(card) => {
                out.push_str("Next appointment\n");
                let _ = writeln!(out, "  {}", appointment_line(card));
            }
            None => out.push_str("No upcoming appointments.\n"),
        },
        TabContent::DoctorTimeline { date, appointments } => {
            let _ = writeln!(out, "Today's schedule ({})", format_display_date(*date));
            if appointments.is_empty() {
                out.push_str("  Nothing scheduled today.\n");
            }
            for card in appointments {
                let _ = writeln!(out, "  {} {} {}", card.time, card.reference, card.appointment_type);
            }
        }
        TabContent::Appointments { upcoming, past, doctors } => {
            out.push_str("Upcoming\n");
            if upcoming.is_empty() {
                out.push_str("  (none)\n");
            }
            for card in upcoming {
                let _ = writeln!(out, "  {}", appointment_line(card));
            }
            out.push_str("Past\n");
            if past.is_empty() {
                out.push_str("  (none)\n");
            }
            for card in past {
                let _ = writeln!(out, "  {}", appointment_line(card));
            }
            out.push_str("Doctors\n");
            for doctor in doctors {
                let _ = writeln!(
                    out,
                    "  {} {} ({}) {:.1}",
                    doctor.id, doctor.name, doctor.specialty, doctor.rating
                );
            }
        }
        TabContent::Records { records } => {
            for record in records {
                let _ = writeln!(out, "{} {} [{}] {}", record.id, record.date, record.record_type, record.title);
                let _ = writeln!(out, "  {}", record.content);
                match (&record.summary, record.summarizing) {
                    (Some(summary), true) => {
                        let _ = writeln!(out, "  AI summary (refreshing...): {}", summary);
                    }
                    (None, true) => out.push_str("  Summarizing...\n"),
                    (Some(summary), false) => {
                        let _ = writeln!(out, "  AI summary: {}", summary);
                    }
                    (None, false) => {}
                }
            }
        }
        TabContent::Profile => {
            let _ = writeln!(out, "Name:   {}", identity.name);
            let _ = writeln!(out, "Email:  {}", identity.email);
            let _ = writeln!(out, "Role:   {}", identity.role);
            let _ = writeln!(out, "Avatar: {}", identity.avatar);
            out.push_str("signout to leave\n");
        }
    }

    if let Some(overlay) = &main.call_overlay {
        render_overlay(out, overlay);
    }
}

fn appointment_line(card: &AppointmentCard) -> String {
    let doctor = card
        .doctor
        .as_ref()
        .map(|d| format!("{} ({})", d.name, d.specialty))
        .unwrap_or_else(|| "Unknown doctor".to_string());
    format!(
        "{} {} {} at {} {} {}",
        card.id, doctor, card.date, card.time, card.appointment_type, card.status
    )
}

fn render_overlay(out: &mut String, overlay: &CallOverlay) {
    out.push_str("================ CALL ================\n");
    let doctor = overlay
        .appointment
        .doctor
        .as_ref()
        .map(|d| format!("{} ({})", d.name, d.specialty))
        .unwrap_or_else(|| "Unknown doctor".to_string());
    let _ = writeln!(out, "{}  {}  {}", doctor, overlay.appointment.reference, overlay.elapsed);

    match &overlay.phase {
        CallPhase::Init | CallPhase::Acquiring => out.push_str("Connecting camera and microphone...\n"),
        CallPhase::Live => {
            let _ = writeln!(
                out,
                "Live  mic: {}  camera: {}",
                on_off(overlay.audio_enabled),
                on_off(overlay.video_enabled)
            );
        }
        CallPhase::Degraded { .. } => {
            if let Some(error) = &overlay.permission_error {
                let _ = writeln!(out, "{}", error);
            }
            out.push_str("retry to try again, end to leave\n");
        }
        CallPhase::Ended => out.push_str("Call ended\n"),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

pub fn render_triage(assessment: Option<&TriageAssessment>) -> String {
    let Some(assessment) = assessment else {
        return "Triage assessment unavailable.\n".to_string();
    };
    let mut out = String::new();
    let _ = writeln!(out, "Urgency: {:?}", assessment.urgency);
    out.push_str("Discuss with your doctor:\n");
    for point in &assessment.discussion_points {
        let _ = writeln!(out, "  - {}", point);
    }
    let _ = writeln!(out, "Self care: {}", assessment.self_care_advice);
    out
}
