use std::sync::Arc;

use crate::db::models::ReservationView;
use crate::db::repositories::ReservationRepository;
use crate::error::AppResult;
use crate::modules::reservations::view::ReservationViewAssembler;

/// Read side of the reservation module: listings enriched with display
/// status and public profiles.
pub struct ReservationQueryService {
    reservations: Arc<dyn ReservationRepository>,
    assembler: Arc<ReservationViewAssembler>,
}

impl ReservationQueryService {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        assembler: Arc<ReservationViewAssembler>,
    ) -> Self {
        Self {
            reservations,
            assembler,
        }
    }

    pub async fn list_by_tutor(&self, tutor_id: &str) -> AppResult<Vec<ReservationView>> {
        let reservations = self.reservations.find_by_tutor(tutor_id, None, None).await?;
        let mut views = Vec::with_capacity(reservations.len());
        for reservation in &reservations {
            views.push(self.assembler.to_view(reservation).await);
        }
        Ok(views)
    }

    pub async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<ReservationView>> {
        let reservations = self
            .reservations
            .find_by_student(student_id, None, None)
            .await?;
        let mut views = Vec::with_capacity(reservations.len());
        for reservation in &reservations {
            views.push(self.assembler.to_view(reservation).await);
        }
        Ok(views)
    }
}
