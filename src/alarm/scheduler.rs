use chrono::{DateTime, Datelike, Days, Duration, Local, LocalResult, NaiveDateTime, TimeZone};

use crate::alarm::model::Alarm;
use crate::notify::{
    ACTION_DISMISS, ACTION_SNOOZE, ACTION_TYPE_ID, ALARM_ACTIONS, NotificationBackend,
    NotificationId, NotificationKind, NotificationPayload, NotificationRequest, PermissionState,
    RepeatEvery,
};

/// Keeps the backend's pending-notification set consistent with the
/// alarm list. Every operation is best-effort: backend failures are
/// logged, recorded in the outcome, and never propagated.
pub struct AlarmReconciler {
    backend: Box<dyn NotificationBackend>,
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub scheduled: Vec<NotificationId>,
    pub cancelled: usize,
    pub failures: Vec<ReconcileFailure>,
}

#[derive(Debug)]
pub struct ReconcileFailure {
    pub id: NotificationId,
    pub reason: String,
}

impl AlarmReconciler {
    pub fn new(backend: Box<dyn NotificationBackend>) -> Self {
        Self { backend }
    }

    /// Requests notification permission and registers the alarm action
    /// types. Denial does not stop later scheduling attempts.
    pub fn init(&mut self) {
        match self.backend.request_permission() {
            Ok(PermissionState::Granted) => log::debug!("notification permission granted"),
            Ok(PermissionState::Denied) => {
                log::warn!("notification permission denied, alarms will not ring");
            }
            Err(err) => log::warn!("notification permission request failed. [error = {err}]"),
        }
        if let Err(err) = self.backend.register_actions(ACTION_TYPE_ID, &ALARM_ACTIONS) {
            log::warn!("failed to register notification actions. [error = {err}]");
        }
    }

    /// Cancels whatever is pending for the alarm, then registers its
    /// future notifications if it is enabled. A partial failure leaves
    /// the accepted requests in place.
    pub fn schedule(&mut self, alarm: &Alarm, now: DateTime<Local>) -> ReconcileOutcome {
        let mut outcome = self.cancel(&alarm.id);
        if !alarm.enabled {
            return outcome;
        }
        for request in notification_requests(alarm, now) {
            let id = request.id.clone();
            match self.backend.schedule(request) {
                Ok(()) => outcome.scheduled.push(id),
                Err(err) => {
                    log::warn!(
                        "failed to schedule notification. [id = {id}, error = {err}]"
                    );
                    outcome.failures.push(ReconcileFailure {
                        id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// Removes every pending notification whose payload references the
    /// alarm, leaving other alarms' notifications untouched.
    pub fn cancel(&mut self, alarm_id: &str) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let pending = match self.backend.pending() {
            Ok(pending) => pending,
            Err(err) => {
                log::warn!("failed to query pending notifications. [error = {err}]");
                return outcome;
            }
        };
        let ids = pending
            .iter()
            .filter(|request| request.payload.alarm_id == alarm_id)
            .map(|request| request.id.clone())
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return outcome;
        }
        match self.backend.cancel(&ids) {
            Ok(()) => outcome.cancelled = ids.len(),
            Err(err) => {
                log::warn!(
                    "failed to cancel notifications. [alarm_id = {alarm_id}, error = {err}]"
                );
                outcome.failures.extend(ids.into_iter().map(|id| ReconcileFailure {
                    id,
                    reason: err.to_string(),
                }));
            }
        }
        outcome
    }

    pub fn cancel_all(&mut self) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let pending = match self.backend.pending() {
            Ok(pending) => pending,
            Err(err) => {
                log::warn!("failed to query pending notifications. [error = {err}]");
                return outcome;
            }
        };
        let ids = pending
            .iter()
            .map(|request| request.id.clone())
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return outcome;
        }
        match self.backend.cancel(&ids) {
            Ok(()) => outcome.cancelled = ids.len(),
            Err(err) => {
                log::warn!("failed to cancel pending notifications. [error = {err}]");
                outcome.failures.extend(ids.into_iter().map(|id| ReconcileFailure {
                    id,
                    reason: err.to_string(),
                }));
            }
        }
        outcome
    }

    pub fn pending(&self) -> Vec<NotificationRequest> {
        match self.backend.pending() {
            Ok(pending) => pending,
            Err(err) => {
                log::warn!("failed to query pending notifications. [error = {err}]");
                Vec::new()
            }
        }
    }

    /// Entry point for platform-delivered notification actions. Snooze
    /// registers one extra non-repeating notification and leaves the
    /// original series untouched; dismiss is acknowledgment only.
    pub fn handle_action(
        &mut self,
        action_id: &str,
        payload: &NotificationPayload,
        alarms: &[Alarm],
        now: DateTime<Local>,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        match action_id {
            ACTION_SNOOZE => {
                let Some(alarm) = alarms.iter().find(|alarm| alarm.id == payload.alarm_id) else {
                    log::warn!(
                        "snooze action for unknown alarm. [alarm_id = {}]",
                        payload.alarm_id
                    );
                    return outcome;
                };
                let request = snooze_request(alarm, now);
                let id = request.id.clone();
                match self.backend.schedule(request) {
                    Ok(()) => {
                        log::info!(
                            "snoozed alarm. [alarm_id = {}, minutes = {}]",
                            alarm.id,
                            alarm.snooze
                        );
                        outcome.scheduled.push(id);
                    }
                    Err(err) => {
                        log::warn!(
                            "failed to schedule snooze notification. [id = {id}, error = {err}]"
                        );
                        outcome.failures.push(ReconcileFailure {
                            id,
                            reason: err.to_string(),
                        });
                    }
                }
            }
            ACTION_DISMISS => {
                // The firing notification was already consumed by the
                // platform; nothing left to do.
                log::info!("dismissed alarm. [alarm_id = {}]", payload.alarm_id);
            }
            other => {
                log::warn!(
                    "ignoring unknown notification action. [action = {other}, alarm_id = {}]",
                    payload.alarm_id
                );
            }
        }
        outcome
    }
}

pub(crate) fn notification_requests(
    alarm: &Alarm,
    now: DateTime<Local>,
) -> Vec<NotificationRequest> {
    fire_instants_in_tz(alarm, &now, &Local)
        .into_iter()
        .map(|(kind, at)| build_request(alarm, kind, at))
        .collect()
}

/// Concrete future fire instants for an alarm. An empty day set yields
/// one non-repeating instant (today, rolled to tomorrow once the time
/// has passed); each selected weekday yields the anchor of its own
/// weekly series, pushed a full week out when today's slot has already
/// passed.
pub(crate) fn fire_instants_in_tz<Tz>(
    alarm: &Alarm,
    now: &DateTime<Tz>,
    timezone: &Tz,
) -> Vec<(NotificationKind, DateTime<Tz>)>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let mut instants = Vec::new();
    let today = now.date_naive();

    if alarm.is_one_time() {
        let today_instant = resolve_local_datetime(timezone, today.and_time(alarm.time));
        match today_instant {
            Some(instant) if instant > *now => {
                instants.push((NotificationKind::Primary, instant));
            }
            _ => {
                let Some(tomorrow) = today.checked_add_days(Days::new(1)) else {
                    return instants;
                };
                match resolve_local_datetime(timezone, tomorrow.and_time(alarm.time)) {
                    Some(instant) => instants.push((NotificationKind::Primary, instant)),
                    None => log::warn!(
                        "skipping unrepresentable local time. [alarm_id = {}, date = {tomorrow}]",
                        alarm.id
                    ),
                }
            }
        }
        return instants;
    }

    let today_passed = match resolve_local_datetime(timezone, today.and_time(alarm.time)) {
        Some(instant) => instant <= *now,
        None => true,
    };
    for day in &alarm.days {
        let target = i64::from(day.to_chrono().num_days_from_sunday());
        let current = i64::from(now.weekday().num_days_from_sunday());
        let mut offset = target - current;
        if offset < 0 {
            offset += 7;
        }
        if offset == 0 && today_passed {
            offset = 7;
        }
        let Some(date) = today.checked_add_days(Days::new(offset as u64)) else {
            continue;
        };
        match resolve_local_datetime(timezone, date.and_time(alarm.time)) {
            Some(instant) => instants.push((NotificationKind::Weekly(*day), instant)),
            None => log::warn!(
                "skipping unrepresentable local time. [alarm_id = {}, date = {date}]",
                alarm.id
            ),
        }
    }
    instants
}

fn build_request(alarm: &Alarm, kind: NotificationKind, at: DateTime<Local>) -> NotificationRequest {
    let repeats = matches!(kind, NotificationKind::Weekly(_));
    NotificationRequest {
        id: NotificationId {
            alarm_id: alarm.id.clone(),
            kind,
        },
        title: alarm.title.clone(),
        body: format!("Alarm time: {}", alarm.time.format("%H:%M")),
        at,
        repeats,
        every: repeats.then_some(RepeatEvery::Week),
        sound: alarm.ringtone.sound_file().to_string(),
        action_type_id: ACTION_TYPE_ID.to_string(),
        payload: payload_for(alarm),
    }
}

fn snooze_request(alarm: &Alarm, now: DateTime<Local>) -> NotificationRequest {
    NotificationRequest {
        id: NotificationId::snooze(&alarm.id),
        title: format!("{} (snoozed)", alarm.title),
        body: format!("Rings again in {} minutes", alarm.snooze),
        at: now + Duration::minutes(i64::from(alarm.snooze)),
        repeats: false,
        every: None,
        sound: alarm.ringtone.sound_file().to_string(),
        action_type_id: ACTION_TYPE_ID.to_string(),
        payload: payload_for(alarm),
    }
}

fn payload_for(alarm: &Alarm) -> NotificationPayload {
    NotificationPayload {
        alarm_id: alarm.id.clone(),
        volume: alarm.volume,
        vibration: alarm.vibration,
        snooze: alarm.snooze,
    }
}

fn resolve_local_datetime<Tz>(timezone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _second) => Some(first),
        LocalResult::None => None,
    }
}
