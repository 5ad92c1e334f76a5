pub mod test_cases;

pub use test_cases::{
    create_test_case, create_test_case_for_all_environments, delete_test_case, get_test_case,
    list_project_environment_test_cases, list_project_test_cases, run_test_case,
    update_test_case,
};
