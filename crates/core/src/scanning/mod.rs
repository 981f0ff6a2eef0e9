pub mod scan_controller;
pub mod scan_event;
pub mod scan_observer;
