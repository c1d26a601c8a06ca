pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod model_resolver;
    pub mod orientation;
}

pub mod detection {
    pub mod domain {
        pub mod detection_request;
        pub mod face_detector;
        pub mod face_landmarks;
        pub mod face_observation;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod camera_authorizer;
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod device_authorizer;
        pub mod ffmpeg_frame_source;
    }
    pub mod capture_session;
    pub mod frame_slot;
    pub mod session_preset;
    pub mod session_queue;
}

pub mod sampling {
    pub mod capture_sampler;
    pub mod face_cropper;
}

pub mod identification {
    pub mod domain {
        pub mod identification_client;
    }
    pub mod infrastructure {
        pub mod http_identification_client;
    }
    pub mod dispatcher;
    pub mod name_label;
}

pub mod overlay {
    pub mod domain {
        pub mod overlay_renderer;
    }
    pub mod infrastructure {
        pub mod log_overlay_renderer;
        pub mod snapshot_overlay_renderer;
    }
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
    }
    pub mod infrastructure {
        pub mod image_file_writer;
    }
}

pub mod pipeline {
    pub mod frame_processor;
    pub mod ui_context;
    pub mod viewfinder;
    pub mod viewfinder_logger;
}
