use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrollments::{self, EnrollmentView, Expand};
use crate::err::Error;
use crate::models::{Course, CoursePatch, EnrollmentFilter, NewCourse, Student, User};
use crate::status::{CourseStatus, EnrollmentStatus};
use crate::store::Store;
use crate::{created, proceeds, validate, AppContext, Created, Input, Param, Payload};

/// How many past classes the course detail shows per enrollment.
const RECENT_CLASSES: i64 = 5;

pub async fn open(store: &dyn Store, course: NewCourse) -> Result<Course, Error> {
    validate::course_code_is_free(store, &course.code, None).await?;
    store.insert_course(&course).await
}

pub async fn detail(store: &dyn Store, id: i32) -> Result<CourseDetail, Error> {
    let course = validate::existing_course(store, id).await?;
    let instructor = store.find_user(course.instructor_id).await?;
    let filter = EnrollmentFilter {
        course_id: Some(id),
        status: Some(EnrollmentStatus::Active),
        ..Default::default()
    };
    let active = store.list_enrollments(&filter).await?;
    let enrollments = enrollments::expand_all(
        store,
        active,
        Expand {
            student: true,
            attendance: Some(Some(RECENT_CLASSES)),
            ..Default::default()
        },
    )
    .await?;
    Ok(CourseDetail {
        course,
        instructor,
        enrollments,
    })
}

/// Students holding an active enrollment in the course, by surname.
pub async fn students_of(store: &dyn Store, id: i32) -> Result<Vec<CourseStudent>, Error> {
    let views = enrollments::of_course(store, id).await?;
    Ok(views
        .into_iter()
        .filter_map(|view| {
            view.student.map(|student| CourseStudent {
                student,
                enrollment_id: view.enrollment.id,
                enrolled_at: view.enrollment.enrolled_at,
            })
        })
        .collect())
}

pub async fn amend(store: &dyn Store, id: i32, patch: CoursePatch) -> Result<Course, Error> {
    if let Some(code) = &patch.code {
        validate::course_code_is_free(store, code, Some(id)).await?;
    }
    store
        .update_course(id, &patch)
        .await?
        .ok_or_else(|| Error::not_found("Curso no encontrado"))
}

pub async fn deactivate(store: &dyn Store, id: i32) -> Result<Course, Error> {
    let patch = CoursePatch {
        status: Some(CourseStatus::Inactive),
        ..Default::default()
    };
    store
        .update_course(id, &patch)
        .await?
        .ok_or_else(|| Error::not_found("Curso no encontrado"))
}

pub async fn create_course(
    State(ctx): State<AppContext>,
    Input(course): Input<NewCourse>,
) -> Created<Course> {
    created(open(ctx.store.as_ref(), course).await?)
}

pub async fn list_courses(State(ctx): State<AppContext>) -> Payload<Vec<Course>> {
    proceeds(ctx.store.list_courses(None).await?)
}

pub async fn list_active_courses(State(ctx): State<AppContext>) -> Payload<Vec<Course>> {
    proceeds(ctx.store.list_courses(Some(CourseStatus::Active)).await?)
}

pub async fn read_course(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
) -> Payload<CourseDetail> {
    proceeds(detail(ctx.store.as_ref(), id).await?)
}

pub async fn course_students(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
) -> Payload<Vec<CourseStudent>> {
    proceeds(students_of(ctx.store.as_ref(), id).await?)
}

pub async fn update_course(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
    Input(patch): Input<CoursePatch>,
) -> Payload<Course> {
    proceeds(amend(ctx.store.as_ref(), id, patch).await?)
}

pub async fn delete_course(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
) -> Payload<CourseDeactivated> {
    let course = deactivate(ctx.store.as_ref(), id).await?;
    proceeds(CourseDeactivated {
        message: "Curso desactivado correctamente",
        course,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    #[serde(rename = "usuario")]
    pub instructor: Option<User>,
    #[serde(rename = "inscripciones")]
    pub enrollments: Vec<EnrollmentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseStudent {
    #[serde(flatten)]
    pub student: Student,
    #[serde(rename = "inscripcionId")]
    pub enrollment_id: i32,
    #[serde(rename = "fecha_inscripcion")]
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDeactivated {
    pub message: &'static str,
    #[serde(rename = "curso")]
    pub course: Course,
}
