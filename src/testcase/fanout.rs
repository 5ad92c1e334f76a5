use uuid::Uuid;

use crate::project::Project;
use crate::schema::{Node, NodeDocument, SchemaError};
use crate::testcase::{TestCase, TestCaseTemplate};

/// Builds one test case per project environment from `template`.
///
/// The schema is validated once up front, so either every copy is produced or
/// none is. Each copy owns its own clone of the schema tree.
pub fn fan_out(project: &Project, template: &TestCaseTemplate) -> Result<Vec<TestCase>, SchemaError> {
    let test_schema = template
        .test_schema
        .clone()
        .unwrap_or_else(|| NodeDocument::smoke(&template.name));
    Node::try_from(&test_schema)?;

    Ok(project
        .environments
        .iter()
        .map(|environment| TestCase {
            id: Uuid::new_v4().to_string(),
            name: template.name.clone(),
            environment: environment.clone(),
            linked_project: project.id.clone(),
            test_schema: test_schema.clone(),
            test_runs: vec![],
            recent_run: None,
            comments: vec![],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EXPECT, Param};

    fn project(environments: &[&str]) -> Project {
        Project {
            id: "project-1".to_string(),
            name: "shop".to_string(),
            environments: environments.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn template() -> TestCaseTemplate {
        TestCaseTemplate {
            name: "checkout".to_string(),
            test_schema: None,
        }
    }

    #[test]
    fn one_test_case_per_environment() {
        let test_cases = fan_out(&project(&["A", "B", "C"]), &template()).unwrap();

        let environments: Vec<_> = test_cases.iter().map(|tc| tc.environment.as_str()).collect();
        assert_eq!(environments, vec!["A", "B", "C"]);
        assert!(test_cases.iter().all(|tc| tc.linked_project == "project-1"));
        assert!(test_cases.iter().all(|tc| tc.name == "checkout"));
    }

    #[test]
    fn copies_are_independent() {
        let mut test_cases = fan_out(&project(&["A", "B"]), &template()).unwrap();
        assert_ne!(test_cases[0].id, test_cases[1].id);

        test_cases[0].test_schema.children.clear();

        assert_eq!(test_cases[1].test_schema, NodeDocument::smoke("checkout"));
    }

    #[test]
    fn no_environments_yields_no_test_cases() {
        assert!(fan_out(&project(&[]), &template()).unwrap().is_empty());
    }

    #[test]
    fn invalid_template_schema_yields_nothing() {
        let template = TestCaseTemplate {
            name: "broken".to_string(),
            test_schema: Some(NodeDocument::new(EXPECT, vec![Param::value(1)])),
        };
        assert!(fan_out(&project(&["A"]), &template).is_err());
    }
}
