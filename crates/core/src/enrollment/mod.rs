pub mod domain;
pub mod enroll_person_use_case;
pub mod infrastructure;
