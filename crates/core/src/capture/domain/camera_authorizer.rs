/// Camera access state as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    NotDetermined,
    Denied,
}

/// Gatekeeper for camera access.
pub trait CameraAuthorizer: Send {
    fn status(&self) -> AuthorizationStatus;

    /// Asks for access when the status is not yet determined.
    /// Returns whether access was granted.
    fn request_access(&mut self) -> bool;
}

/// Authorizer for sources that need no permission (files, test doubles).
pub struct AlwaysAuthorized;

impl CameraAuthorizer for AlwaysAuthorized {
    fn status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_access(&mut self) -> bool {
        true
    }
}
