use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A catalog entry a line item can be pre-filled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub code: Option<String>,
}

/// A student the client block can be copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>>;
}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn list_students(&self) -> Result<Vec<Student>>;
}

/// Fixed course list.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    courses: Vec<Course>,
}

impl StaticCatalog {
    pub fn new(courses: Vec<Course>) -> Self {
        StaticCatalog { courses }
    }
}

#[async_trait]
impl CourseCatalog for StaticCatalog {
    async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.courses.clone())
    }
}

/// Fixed student list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    students: Vec<Student>,
}

impl StaticDirectory {
    pub fn new(students: Vec<Student>) -> Self {
        StaticDirectory { students }
    }
}

#[async_trait]
impl StudentDirectory for StaticDirectory {
    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self.students.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn static_lookups_return_their_lists() {
        let catalog = StaticCatalog::new(vec![Course {
            id: "c1".into(),
            title: "Rust Fundamentals".into(),
            price: dec!(499),
            code: Some("RST-101".into()),
        }]);
        let courses = catalog.list_courses().await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].code.as_deref(), Some("RST-101"));

        let directory = StaticDirectory::default();
        assert!(directory.list_students().await.unwrap().is_empty());
    }

    #[test]
    fn student_rows_use_snake_case() {
        let student: Student =
            serde_json::from_str(r#"{"id":"s1","email":"ana@example.com","full_name":"Ana Silva","phone":null}"#)
                .unwrap();
        assert_eq!(student.full_name, "Ana Silva");
        assert!(student.phone.is_none());
    }
}
