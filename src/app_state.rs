use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::repositories::{
    PgReservationRepository, PgSlotRepository, ReservationRepository, SlotRepository,
};
use crate::modules::availability::service::AvailabilityService;
use crate::modules::reservations::query::ReservationQueryService;
use crate::modules::reservations::service::ReservationService;
use crate::modules::reservations::view::ReservationViewAssembler;
use crate::modules::schedule::service::ScheduleService;
use crate::security::UserServiceClient;
use crate::time_util::{CivilClock, Clock};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub availability: Arc<AvailabilityService>,
    pub reservations: Arc<ReservationService>,
    pub schedule: Arc<ScheduleService>,
    pub queries: Arc<ReservationQueryService>,
    pub users: Arc<UserServiceClient>,
}

impl AppState {
    pub fn new(db: PgPool, env: &Config) -> Result<Self> {
        let slots: Arc<dyn SlotRepository> = Arc::new(PgSlotRepository::new(db.clone()));
        let reservation_repo: Arc<dyn ReservationRepository> =
            Arc::new(PgReservationRepository::new(db.clone()));
        let clock: Arc<dyn Clock> = Arc::new(CivilClock);

        let users = Arc::new(UserServiceClient::new(
            &env.user_service.base_url,
            Duration::from_secs(env.user_service.timeout_seconds),
        )?);

        let availability = Arc::new(AvailabilityService::new(slots.clone()));
        let reservations = Arc::new(ReservationService::new(
            reservation_repo.clone(),
            slots.clone(),
            clock.clone(),
        ));
        let schedule = Arc::new(ScheduleService::new(slots, reservation_repo.clone()));
        let assembler = Arc::new(ReservationViewAssembler::new(users.clone(), clock));
        let queries = Arc::new(ReservationQueryService::new(reservation_repo, assembler));

        Ok(Self {
            db,
            availability,
            reservations,
            schedule,
            queries,
            users,
        })
    }
}
