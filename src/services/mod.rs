//! Business logic services

pub mod books;
pub mod borrows;
pub mod email;
pub mod notifications;
pub mod penalties;
pub mod reservations;
pub mod scheduler;
pub mod sweeps;
pub mod templates;
pub mod users;

use std::sync::Arc;

use crate::{config::LendingConfig, repository::Repository};

/// Service container wired over one repository and one outbound mailer.
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub notifications: notifications::NotificationsService,
    pub penalties: penalties::PenaltyService,
    pub reservations: reservations::ReservationsService,
    pub borrows: borrows::BorrowsService,
    pub users: users::UsersService,
    pub sweeps: sweeps::SweepService,
}

impl Services {
    pub fn new(
        repository: Repository,
        lending: LendingConfig,
        mailer: Arc<dyn email::Mailer>,
    ) -> Self {
        let notifications = notifications::NotificationsService::new(repository.clone(), mailer);
        let penalties = penalties::PenaltyService::new(
            repository.clone(),
            notifications.clone(),
            lending.penalty_threshold,
        );
        let reservations = reservations::ReservationsService::new(
            repository.clone(),
            notifications.clone(),
            lending,
        );
        let borrows = borrows::BorrowsService::new(
            repository.clone(),
            notifications.clone(),
            penalties.clone(),
        );
        let users = users::UsersService::new(repository.clone(), notifications.clone());
        let books = books::BooksService::new(repository.clone());
        let sweeps = sweeps::SweepService::new(repository, notifications.clone(), penalties.clone());

        Self {
            books,
            notifications,
            penalties,
            reservations,
            borrows,
            users,
            sweeps,
        }
    }
}
