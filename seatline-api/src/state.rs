use seatline_core::SeatingService;

#[derive(Clone)]
pub struct AppState {
    pub service: SeatingService,
}

impl AppState {
    pub fn new(service: SeatingService) -> Self {
        Self { service }
    }
}
