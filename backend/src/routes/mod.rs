use crate::{
    errors::HandlerError,
    models::{auth::Claim, user::UserRole},
};

pub mod admin;
pub mod bid;
pub mod listing;
pub mod transaction;

fn check_role(claim: &Claim, role: UserRole) -> Result<(), HandlerError> {
    if claim.role != role {
        return Err(HandlerError::Forbidden(format!(
            "Only {} can use this.",
            role
        )));
    }
    Ok(())
}
