use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};

use availability_cell::{AvailabilityService, BookingRequest, MemoryStore};
use catalog_cell::{build, default_catalog_file};
use session_cell::{Clock, DialogueService, Reply, SessionState};

struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    fn at(datetime: &str) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(datetime.parse().unwrap()),
        })
    }

    fn set(&self, datetime: &str) {
        *self.now.lock().unwrap() = datetime.parse().unwrap();
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn setup(clock: Arc<TestClock>) -> (DialogueService, Arc<AvailabilityService>) {
    let catalog = Arc::new(build(default_catalog_file()).unwrap());
    let engine =
        Arc::new(AvailabilityService::new(catalog, Arc::new(MemoryStore::new())).unwrap());
    (DialogueService::new(Arc::clone(&engine), clock), engine)
}

// Monday, so the next two weeks hold ten weekdays.
fn monday_setup() -> (DialogueService, Arc<AvailabilityService>) {
    setup(TestClock::at("2024-06-03T10:00:00Z"))
}

fn choice(id: &str) -> Reply {
    Reply::Choice(id.to_string())
}

fn text(text: &str) -> Reply {
    Reply::Text(text.to_string())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn take_slot(engine: &AvailabilityService, doctor_id: i64, day: NaiveDate, at: NaiveTime) {
    engine
        .commit_appointment(BookingRequest {
            user_id: 7,
            doctor_id,
            date: day,
            time: at,
            patient_name: "Maria Sergeevna Volkova".to_string(),
            phone: "+79001112233".to_string(),
        })
        .unwrap();
}

#[test]
fn happy_path_books_an_appointment() {
    let (dialogue, engine) = monday_setup();
    let user = 42;

    let step = dialogue
        .advance(user, SessionState::SelectDepartment, &choice("dept:1"))
        .unwrap();
    assert_matches!(step.next, SessionState::SelectDoctor { department_id: 1 });
    assert!(step.prompt.choices.iter().any(|c| c.id == "doctor:2"));

    let step = dialogue.advance(user, step.next, &choice("doctor:2")).unwrap();
    assert_matches!(
        step.next,
        SessionState::SelectDate {
            department_id: 1,
            doctor_id: 2,
        }
    );

    let step = dialogue
        .advance(user, step.next, &choice("date:2024-06-04"))
        .unwrap();
    assert_matches!(step.next, SessionState::SelectTime { .. });
    // 16 free slots plus the back button.
    assert_eq!(step.prompt.choices.len(), 17);

    let step = dialogue.advance(user, step.next, &choice("time:10:00")).unwrap();
    assert_matches!(step.next, SessionState::EnterName { .. });

    let step = dialogue
        .advance(user, step.next, &text("Anna Petrovna Ivanova"))
        .unwrap();
    assert_matches!(step.next, SessionState::EnterPhone { .. });

    let step = dialogue
        .advance(user, step.next, &text("+7 916 1234567"))
        .unwrap();
    assert_matches!(step.next, SessionState::Confirm { .. });
    assert!(step.prompt.text.contains("E. Petrova"));

    let step = dialogue.advance(user, step.next, &choice("confirm")).unwrap();
    assert_matches!(step.next, SessionState::Done);

    let booked = step.booked.expect("confirm should commit");
    assert_eq!(booked.id, 1);
    assert_eq!(booked.doctor_id, 2);
    assert_eq!(booked.date, date(2024, 6, 4));
    assert_eq!(booked.time, time(10, 0));
    assert_eq!(booked.patient_name, "Anna Petrovna Ivanova");
    assert_eq!(booked.phone, "+7 916 1234567");
    assert_eq!(engine.user_appointments(user), vec![booked]);
}

#[test]
fn one_token_name_is_rejected_without_transition() {
    let (dialogue, engine) = monday_setup();
    let state = SessionState::EnterName {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
        time: time(10, 0),
    };

    let step = dialogue.advance(42, state.clone(), &text("Anna")).unwrap();

    assert_eq!(step.next, state);
    assert!(step.booked.is_none());
    assert!(engine.user_appointments(42).is_empty());
}

#[test]
fn choice_input_in_a_text_state_is_rejected() {
    let (dialogue, _) = monday_setup();
    let state = SessionState::EnterName {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
        time: time(10, 0),
    };

    let step = dialogue.advance(42, state.clone(), &choice("time:10:00")).unwrap();
    assert_eq!(step.next, state);
}

#[test]
fn short_or_non_numeric_phone_is_rejected() {
    let (dialogue, _) = monday_setup();
    let state = SessionState::EnterPhone {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
        time: time(10, 0),
        patient_name: "Anna Petrovna Ivanova".to_string(),
    };

    let step = dialogue.advance(42, state.clone(), &text("12345")).unwrap();
    assert_eq!(step.next, state);

    let step = dialogue
        .advance(42, state.clone(), &text("phone-number-here"))
        .unwrap();
    assert_eq!(step.next, state);
}

#[test]
fn back_navigation_drops_dependent_selections() {
    let (dialogue, _) = monday_setup();
    let state = SessionState::SelectTime {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
    };

    let step = dialogue.advance(42, state, &choice("back")).unwrap();
    assert_matches!(
        step.next,
        SessionState::SelectDate {
            department_id: 1,
            doctor_id: 2,
        }
    );

    let step = dialogue.advance(42, step.next, &choice("back")).unwrap();
    assert_matches!(step.next, SessionState::SelectDoctor { department_id: 1 });

    // Picking a different doctor restarts from date selection: the earlier
    // date and time cannot survive because the state simply has no room for
    // them until they are chosen again.
    let step = dialogue.advance(42, step.next, &choice("doctor:1")).unwrap();
    assert_matches!(
        step.next,
        SessionState::SelectDate {
            department_id: 1,
            doctor_id: 1,
        }
    );
}

#[test]
fn department_without_doctors_re_prompts() {
    let (dialogue, _) = monday_setup();

    // Ophthalmology has no doctors in the default catalog.
    let step = dialogue
        .advance(42, SessionState::SelectDepartment, &choice("dept:5"))
        .unwrap();
    assert_eq!(step.next, SessionState::SelectDepartment);
    assert!(step.prompt.text.contains("No doctors"));
}

#[test]
fn unknown_or_garbage_input_keeps_state() {
    let (dialogue, _) = monday_setup();

    let step = dialogue
        .advance(42, SessionState::SelectDepartment, &choice("dept:99"))
        .unwrap();
    assert_eq!(step.next, SessionState::SelectDepartment);

    let step = dialogue
        .advance(42, SessionState::SelectDepartment, &choice("bogus"))
        .unwrap();
    assert_eq!(step.next, SessionState::SelectDepartment);

    let step = dialogue
        .advance(42, SessionState::SelectDepartment, &text("hello"))
        .unwrap();
    assert_eq!(step.next, SessionState::SelectDepartment);
}

#[test]
fn doctor_from_another_department_is_rejected() {
    let (dialogue, _) = monday_setup();
    let state = SessionState::SelectDoctor { department_id: 1 };

    // Doctor 3 works in Surgery, not Therapy.
    let step = dialogue.advance(42, state.clone(), &choice("doctor:3")).unwrap();
    assert_eq!(step.next, state);
}

#[test]
fn window_from_friday_offers_ten_weekdays() {
    let (dialogue, _) = setup(TestClock::at("2024-06-07T09:00:00Z"));

    let window = dialogue.booking_window();

    assert_eq!(window.len(), 10);
    assert!(window
        .iter()
        .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
    assert_eq!(window.first().copied(), Some(date(2024, 6, 10)));
    assert_eq!(window.last().copied(), Some(date(2024, 6, 21)));
}

#[test]
fn window_shifts_when_the_clock_moves() {
    let clock = TestClock::at("2024-06-03T10:00:00Z");
    let (dialogue, _) = setup(Arc::clone(&clock));

    let before = dialogue.booking_window();
    assert_eq!(before.first().copied(), Some(date(2024, 6, 4)));

    clock.set("2024-06-04T10:00:00Z");
    let after = dialogue.booking_window();
    assert_eq!(after.first().copied(), Some(date(2024, 6, 5)));
    assert_ne!(before, after);
}

#[test]
fn date_outside_window_is_rejected() {
    let (dialogue, _) = monday_setup();
    let state = SessionState::SelectDate {
        department_id: 1,
        doctor_id: 2,
    };

    let step = dialogue
        .advance(42, state.clone(), &choice("date:2024-07-30"))
        .unwrap();
    assert_eq!(step.next, state);

    // In range but a Saturday.
    let step = dialogue
        .advance(42, state.clone(), &choice("date:2024-06-08"))
        .unwrap();
    assert_eq!(step.next, state);
}

#[test]
fn fully_booked_date_re_prompts_date_selection() {
    let (dialogue, engine) = monday_setup();
    for slot in engine.slot_grid() {
        take_slot(&engine, 2, date(2024, 6, 4), slot);
    }
    let state = SessionState::SelectDate {
        department_id: 1,
        doctor_id: 2,
    };

    let step = dialogue
        .advance(42, state.clone(), &choice("date:2024-06-04"))
        .unwrap();

    assert_eq!(step.next, state);
    assert!(step.prompt.text.contains("No free time"));
}

#[test]
fn stale_time_choice_re_prompts_with_fresh_slots() {
    let (dialogue, engine) = monday_setup();
    take_slot(&engine, 2, date(2024, 6, 4), time(10, 0));
    let state = SessionState::SelectTime {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
    };

    let step = dialogue.advance(42, state.clone(), &choice("time:10:00")).unwrap();

    assert_eq!(step.next, state);
    assert!(!step.prompt.choices.iter().any(|c| c.id == "time:10:00"));
    assert!(step.prompt.choices.iter().any(|c| c.id == "time:10:30"));
}

#[test]
fn commit_conflict_loops_back_to_time_selection() {
    let (dialogue, engine) = monday_setup();
    let state = SessionState::Confirm {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
        time: time(10, 0),
        patient_name: "Anna Petrovna Ivanova".to_string(),
        phone: "+79161234567".to_string(),
    };

    // Another session takes the slot between the summary and the confirm tap.
    take_slot(&engine, 2, date(2024, 6, 4), time(10, 0));

    let step = dialogue.advance(42, state, &choice("confirm")).unwrap();

    assert_matches!(
        step.next,
        SessionState::SelectTime {
            department_id: 1,
            doctor_id: 2,
            ..
        }
    );
    assert!(step.booked.is_none());
    assert!(!step.prompt.choices.iter().any(|c| c.id == "time:10:00"));
    assert!(step.prompt.choices.iter().any(|c| c.id == "time:10:30"));
}

#[test]
fn reject_at_confirm_ends_without_booking() {
    let (dialogue, engine) = monday_setup();
    let state = SessionState::Confirm {
        department_id: 1,
        doctor_id: 2,
        date: date(2024, 6, 4),
        time: time(10, 0),
        patient_name: "Anna Petrovna Ivanova".to_string(),
        phone: "+79161234567".to_string(),
    };

    let step = dialogue.advance(42, state, &choice("reject")).unwrap();

    assert_matches!(step.next, SessionState::Done);
    assert!(step.booked.is_none());
    assert!(engine.user_appointments(42).is_empty());
}
