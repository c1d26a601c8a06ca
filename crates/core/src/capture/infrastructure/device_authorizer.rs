use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::capture::domain::camera_authorizer::{AuthorizationStatus, CameraAuthorizer};

/// Camera permission for device nodes such as `/dev/video0`.
///
/// Access is granted when the node can be opened for reading. A missing node
/// is left undetermined so that configuration reports it instead.
pub struct DeviceAuthorizer {
    path: PathBuf,
}

impl DeviceAuthorizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn check_access(&self) -> AuthorizationStatus {
        match File::open(&self.path) {
            Ok(_) => AuthorizationStatus::Authorized,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => AuthorizationStatus::Denied,
            Err(_) => AuthorizationStatus::NotDetermined,
        }
    }
}

impl CameraAuthorizer for DeviceAuthorizer {
    fn status(&self) -> AuthorizationStatus {
        self.check_access()
    }

    fn request_access(&mut self) -> bool {
        // There is no prompt to show; only an explicit denial is final.
        let status = self.check_access();
        log::info!(
            "Camera access for {} is {:?}",
            self.path.display(),
            status
        );
        status != AuthorizationStatus::Denied
    }
}
