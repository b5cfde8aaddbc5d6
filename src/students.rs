use axum::extract::State;
use futures::future::try_join_all;
use serde::Serialize;

use crate::enrollments::{self, EnrollmentView};
use crate::err::Error;
use crate::models::{NewStudent, Student, StudentFilter, StudentPatch};
use crate::status::StudentStatus;
use crate::store::Store;
use crate::{created, proceeds, validate, AppContext, Created, Filter, Input, Param, Payload};

pub async fn register(store: &dyn Store, student: NewStudent) -> Result<Student, Error> {
    validate::student_identity_is_free(
        store,
        Some(&student.document_number),
        Some(&student.email),
        None,
    )
    .await?;
    store.insert_student(&student).await
}

/// Students matching `filter` by surname, each with its enrollments and
/// their courses.
pub async fn listing(
    store: &dyn Store,
    filter: &StudentFilter,
) -> Result<Vec<StudentDetail>, Error> {
    let mut students = store.list_students(filter).await?;
    students.sort_by(|a, b| a.name_order(b));
    try_join_all(students.into_iter().map(|student| async move {
        let enrollments = enrollments::courses_of(store, student.id).await?;
        Ok::<_, Error>(StudentDetail {
            student,
            enrollments,
        })
    }))
    .await
}

pub async fn detail(store: &dyn Store, id: i32) -> Result<StudentDetail, Error> {
    let student = store
        .find_student(id)
        .await?
        .ok_or_else(|| Error::not_found("Estudiante no encontrado"))?;
    let enrollments = enrollments::of_student(store, id).await?;
    Ok(StudentDetail {
        student,
        enrollments,
    })
}

pub async fn amend(store: &dyn Store, id: i32, patch: StudentPatch) -> Result<Student, Error> {
    validate::student_identity_is_free(
        store,
        patch.document_number.as_deref(),
        patch.email.as_deref(),
        Some(id),
    )
    .await?;
    store
        .update_student(id, &patch)
        .await?
        .ok_or_else(|| Error::not_found("Estudiante no encontrado"))
}

pub async fn deactivate(store: &dyn Store, id: i32) -> Result<Student, Error> {
    let patch = StudentPatch {
        status: Some(StudentStatus::Inactive),
        ..Default::default()
    };
    store
        .update_student(id, &patch)
        .await?
        .ok_or_else(|| Error::not_found("Estudiante no encontrado"))
}

pub async fn create_student(
    State(ctx): State<AppContext>,
    Input(student): Input<NewStudent>,
) -> Created<Student> {
    created(register(ctx.store.as_ref(), student).await?)
}

pub async fn list_students(State(ctx): State<AppContext>) -> Payload<Vec<StudentDetail>> {
    proceeds(listing(ctx.store.as_ref(), &StudentFilter::default()).await?)
}

pub async fn search_students(
    State(ctx): State<AppContext>,
    Filter(filter): Filter<StudentFilter>,
) -> Payload<Vec<StudentDetail>> {
    proceeds(listing(ctx.store.as_ref(), &filter).await?)
}

pub async fn read_student(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
) -> Payload<StudentDetail> {
    proceeds(detail(ctx.store.as_ref(), id).await?)
}

pub async fn update_student(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
    Input(patch): Input<StudentPatch>,
) -> Payload<Student> {
    proceeds(amend(ctx.store.as_ref(), id, patch).await?)
}

pub async fn delete_student(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
) -> Payload<StudentDeactivated> {
    let student = deactivate(ctx.store.as_ref(), id).await?;
    proceeds(StudentDeactivated {
        message: "Estudiante desactivado correctamente",
        student,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    #[serde(rename = "inscripciones")]
    pub enrollments: Vec<EnrollmentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDeactivated {
    pub message: &'static str,
    #[serde(rename = "estudiante")]
    pub student: Student,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::courses::tests::{sample_course, staffed_store};
    use crate::enrollments::tests::request;
    use crate::store::memory::MemoryStore;
    use chrono::NaiveDate;

    pub(crate) fn sample_student(document: &str, surname: &str) -> NewStudent {
        NewStudent {
            first_name: "Laura".to_string(),
            last_name: surname.to_string(),
            document_type: "CC".to_string(),
            document_number: document.to_string(),
            birth_date: NaiveDate::from_ymd_opt(2002, 8, 14).unwrap(),
            email: format!("{}@example.com", document),
            phone: None,
            city: Some("Cali".to_string()),
            status: StudentStatus::Active,
        }
    }

    #[tokio::test]
    async fn fresh_student_is_retrievable() {
        let store = MemoryStore::new();
        let student = register(&store, sample_student("1001", "Rojas")).await.unwrap();
        let found = detail(&store, student.id).await.unwrap();
        assert_eq!(found.student, student);
        assert!(found.enrollments.is_empty());
    }

    #[tokio::test]
    async fn reused_document_or_email_conflicts() {
        let store = MemoryStore::new();
        register(&store, sample_student("1001", "Rojas")).await.unwrap();

        let same_document = register(&store, sample_student("1001", "Pérez")).await;
        assert!(matches!(same_document, Err(Error::Conflict { .. })));

        let mut same_email = sample_student("2002", "Pérez");
        same_email.email = "1001@example.com".to_string();
        assert!(matches!(
            register(&store, same_email).await,
            Err(Error::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn update_only_touches_present_fields() {
        let store = MemoryStore::new();
        let student = register(&store, sample_student("1001", "Rojas")).await.unwrap();

        let patch = StudentPatch {
            city: Some(String::new()),
            phone: Some("3100000000".to_string()),
            ..Default::default()
        };
        let updated = amend(&store, student.id, patch).await.unwrap();
        assert_eq!(updated.city.as_deref(), Some(""));
        assert_eq!(updated.phone.as_deref(), Some("3100000000"));
        assert_eq!(updated.last_name, "Rojas");
        assert_eq!(updated.email, student.email);
    }

    #[tokio::test]
    async fn update_may_keep_own_document_but_not_take_anothers() {
        let store = MemoryStore::new();
        let ana = register(&store, sample_student("1001", "Rojas")).await.unwrap();
        register(&store, sample_student("2002", "Pérez")).await.unwrap();

        let own = StudentPatch {
            document_number: Some("1001".to_string()),
            ..Default::default()
        };
        assert!(amend(&store, ana.id, own).await.is_ok());

        let taken = StudentPatch {
            document_number: Some("2002".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            amend(&store, ana.id, taken).await,
            Err(Error::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn soft_delete_keeps_the_row() {
        let store = MemoryStore::new();
        let student = register(&store, sample_student("1001", "Rojas")).await.unwrap();

        let removed = deactivate(&store, student.id).await.unwrap();
        assert_eq!(removed.status, StudentStatus::Inactive);

        let found = detail(&store, student.id).await.unwrap();
        assert_eq!(found.student.status, StudentStatus::Inactive);
        assert_eq!(found.student.document_number, "1001");
    }

    #[tokio::test]
    async fn missing_student_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            deactivate(&store, 5).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            amend(&store, 5, StudentPatch::default()).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn search_matches_name_and_status() {
        let store = MemoryStore::new();
        register(&store, sample_student("1001", "Rojas")).await.unwrap();
        let other = register(&store, sample_student("2002", "Ramírez")).await.unwrap();
        register(&store, sample_student("3003", "Gómez")).await.unwrap();
        deactivate(&store, other.id).await.unwrap();

        let filter = StudentFilter {
            name: Some("r".to_string()),
            status: Some(StudentStatus::Active),
            ..Default::default()
        };
        let found = store.list_students(&filter).await.unwrap();
        let surnames: Vec<_> = found.iter().map(|s| s.last_name.as_str()).collect();
        // "Laura" matches every first name, so only the status narrows it.
        assert_eq!(surnames, ["Gómez", "Rojas"]);
    }

    #[tokio::test]
    async fn listing_sorts_by_folded_surname_and_carries_courses() {
        let store = staffed_store();
        let course = store.insert_course(&sample_course("ING-1")).await.unwrap();
        let people = [("1", "Bravo"), ("2", "Ávila"), ("3", "de la Cruz"), ("4", "Zapata")];
        for (document, surname) in people {
            register(&store, sample_student(document, surname)).await.unwrap();
        }
        enrollments::enroll(&store, request(2, course.id)).await.unwrap();

        let listed = listing(&store, &StudentFilter::default()).await.unwrap();
        let surnames: Vec<_> = listed.iter().map(|d| d.student.last_name.as_str()).collect();
        assert_eq!(surnames, ["Ávila", "Bravo", "de la Cruz", "Zapata"]);

        let json = serde_json::to_value(&listed[0]).unwrap();
        assert_eq!(json["inscripciones"][0]["curso"]["codigo_curso"], "ING-1");
        assert!(json["inscripciones"][0].get("asistencias").is_none());
        assert_eq!(json["inscripciones"][0]["estudianteId"], 2);
        assert_eq!(listed[1].enrollments.len(), 0);
    }

    #[tokio::test]
    async fn search_terms_are_taken_literally() {
        let store = MemoryStore::new();
        register(&store, sample_student("1001", "Rojas")).await.unwrap();
        for term in ["_", "%"] {
            let filter = StudentFilter {
                name: Some(term.to_string()),
                ..Default::default()
            };
            assert!(listing(&store, &filter).await.unwrap().is_empty());
        }
    }
}
