//! Alarms service
//!
//! Manages dosage alarms and delivers them when due.
//! A background task checks every `SCHEDULER_TICK_SECS` and fires each
//! local minute at most once. Minutes skipped by a late tick are replayed,
//! up to `SCHEDULER_MAX_CATCH_UP_MINUTES`.

use crate::config::{
    ALARM_EVENT_CHANNEL_CAPACITY, SCHEDULER_MAX_CATCH_UP_MINUTES, SCHEDULER_TICK_SECS,
};
use crate::error::{AppError, Result};
use crate::services::SettingsService;
use crate::store::{
    parse_time_of_day, Alarm, AlarmDay, AlarmId, MedicineId, NewAlarm, SharedRepository,
};
use chrono::{Duration, Local, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Payload delivered when an alarm rings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmEvent {
    pub alarm_id: AlarmId,
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub time: String,
    pub sound: bool,
    pub vibration: bool,
}

/// Alarms service with background scheduler
#[derive(Clone)]
pub struct AlarmsService {
    repo: SharedRepository,
    settings: SettingsService,
    events: Arc<Mutex<Option<mpsc::Sender<AlarmEvent>>>>,
}

impl AlarmsService {
    pub fn new(repo: SharedRepository, settings: SettingsService) -> Self {
        Self {
            repo,
            settings,
            events: Arc::new(Mutex::new(None)),
        }
    }

    /// Receive alarm events. A new subscriber replaces the previous one.
    pub async fn subscribe(&self) -> mpsc::Receiver<AlarmEvent> {
        let (tx, rx) = mpsc::channel(ALARM_EVENT_CHANNEL_CAPACITY);
        *self.events.lock().await = Some(tx);
        rx
    }

    /// Create an alarm for a stored medicine.
    ///
    /// Sound and vibration default to the alarm settings when not given.
    pub async fn create_alarm(
        &self,
        medicine_id: MedicineId,
        time: String,
        days: BTreeSet<AlarmDay>,
        sound_enabled: Option<bool>,
        vibration_enabled: Option<bool>,
    ) -> Result<Alarm> {
        if parse_time_of_day(&time).is_none() {
            return Err(AppError::InvalidAlarmTime(time));
        }

        let defaults = self.settings.get_alarms().await?;

        let mut repo = self.repo.write().await;
        let medicine = repo
            .get_medicine_by_id(medicine_id)
            .ok_or(AppError::MedicineNotFound(medicine_id))?;

        tracing::info!("Creating alarm for {} at {}", medicine.name, time);

        Ok(repo.add_alarm(NewAlarm {
            medicine_id,
            medicine_name: medicine.name,
            time,
            days,
            sound_enabled: sound_enabled.unwrap_or(defaults.sound_enabled),
            vibration_enabled: vibration_enabled.unwrap_or(defaults.vibration_enabled),
            enabled: true,
        }))
    }

    pub async fn get_alarm(&self, id: AlarmId) -> Result<Alarm> {
        self.repo
            .read()
            .await
            .get_alarm_by_id(id)
            .ok_or(AppError::AlarmNotFound(id))
    }

    pub async fn list_alarms(&self) -> Vec<Alarm> {
        self.repo.read().await.get_all_alarms()
    }

    pub async fn list_alarms_for_medicine(&self, medicine_id: MedicineId) -> Vec<Alarm> {
        self.repo.read().await.get_alarms_by_medicine(medicine_id)
    }

    pub async fn list_active_alarms(&self) -> Vec<Alarm> {
        self.repo.read().await.get_active_alarms()
    }

    pub async fn update_alarm(&self, alarm: Alarm) -> Result<Alarm> {
        if parse_time_of_day(&alarm.time).is_none() {
            return Err(AppError::InvalidAlarmTime(alarm.time));
        }

        let id = alarm.id;
        let mut repo = self.repo.write().await;
        if repo.get_medicine_by_id(alarm.medicine_id).is_none() {
            return Err(AppError::MedicineNotFound(alarm.medicine_id));
        }
        if !repo.update_alarm(alarm.clone()) {
            return Err(AppError::AlarmNotFound(id));
        }

        tracing::debug!("Alarm updated: {}", id);
        Ok(alarm)
    }

    /// Delete an alarm. Returns whether anything was removed.
    pub async fn delete_alarm(&self, id: AlarmId) -> bool {
        tracing::info!("Deleting alarm: {}", id);
        self.repo.write().await.delete_alarm(id)
    }

    /// Flip the enabled switch, returning the new state
    pub async fn toggle_alarm(&self, id: AlarmId) -> Result<bool> {
        self.repo
            .write()
            .await
            .toggle_alarm_enabled(id)
            .ok_or(AppError::AlarmNotFound(id))
    }

    /// The enabled alarm that rings soonest after `now`, with its time
    pub async fn next_due(&self, now: NaiveDateTime) -> Option<(Alarm, NaiveDateTime)> {
        self.list_active_alarms()
            .await
            .into_iter()
            .filter_map(|alarm| alarm.next_trigger_after(now).map(|at| (alarm, at)))
            .min_by_key(|(_, at)| *at)
    }

    /// Start the background scheduler
    pub fn start_scheduler(self) {
        tokio::spawn(async move {
            tracing::info!("Starting alarm scheduler");

            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(SCHEDULER_TICK_SECS));
            let mut last_minute: Option<NaiveDateTime> = None;

            loop {
                interval.tick().await;

                let now = truncate_to_minute(Local::now().naive_local());
                let pending = minutes_to_check(last_minute, now);
                if pending.is_empty() {
                    continue;
                }
                if pending.len() > 1 {
                    tracing::warn!("Scheduler fell behind, catching up {} minutes", pending.len());
                }
                last_minute = Some(now);

                for minute in pending {
                    if let Err(e) = self.check_and_fire(minute).await {
                        tracing::error!("Error checking alarms: {}", e);
                    }
                }
            }
        });
    }

    /// Fire every alarm due in the minute containing `now`
    async fn check_and_fire(&self, now: NaiveDateTime) -> Result<Vec<AlarmEvent>> {
        let alarms = self.list_active_alarms().await;
        let due = due_alarms(&alarms, now);
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let settings = self.settings.get_alarms().await?;
        let events: Vec<AlarmEvent> = due
            .into_iter()
            .map(|alarm| AlarmEvent {
                alarm_id: alarm.id,
                medicine_id: alarm.medicine_id,
                medicine_name: alarm.medicine_name.clone(),
                time: alarm.time.clone(),
                sound: alarm.sound_enabled && settings.sound_enabled,
                vibration: alarm.vibration_enabled && settings.vibration_enabled,
            })
            .collect();

        if !settings.notifications_enabled {
            tracing::info!("{} alarms due but notifications are off", events.len());
            return Ok(events);
        }

        for event in &events {
            tracing::info!("Alarm {} ringing for {}", event.alarm_id, event.medicine_name);
            self.send_event(event.clone()).await;
        }

        Ok(events)
    }

    async fn send_event(&self, event: AlarmEvent) {
        let events = self.events.lock().await;

        match events.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.try_send(event) {
                    tracing::error!("Failed to deliver alarm event: {}", e);
                }
            }
            None => tracing::debug!("No alarm subscriber, event dropped"),
        }
    }
}

/// Enabled alarms that ring during the minute containing `now`.
/// Alarms with an unparseable time never ring.
pub fn due_alarms(alarms: &[Alarm], now: NaiveDateTime) -> Vec<&Alarm> {
    alarms
        .iter()
        .filter(|alarm| {
            if alarm.time_of_day().is_none() {
                tracing::debug!("Skipping alarm {} with invalid time {:?}", alarm.id, alarm.time);
                return false;
            }
            alarm.fires_at(now)
        })
        .collect()
}

/// Minutes after `last` up to and including `now`, at most
/// `SCHEDULER_MAX_CATCH_UP_MINUTES` of them. A clock that jumped back further
/// than the window restarts from `now`.
fn minutes_to_check(last: Option<NaiveDateTime>, now: NaiveDateTime) -> Vec<NaiveDateTime> {
    let window = Duration::minutes(SCHEDULER_MAX_CATCH_UP_MINUTES);

    let Some(last) = last else {
        return vec![now];
    };
    if now <= last {
        return if last - now > window { vec![now] } else { Vec::new() };
    }

    let mut minute = (last + Duration::minutes(1)).max(now - window + Duration::minutes(1));
    let mut minutes = Vec::new();
    while minute <= now {
        minutes.push(minute);
        minute += Duration::minutes(1);
    }
    minutes
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
