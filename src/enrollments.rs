use std::cmp::Ordering;

use axum::extract::State;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::models::{
    AttendanceEntry, AttendanceFilter, Course, Enrollment, EnrollmentFilter, NewEnrollment,
    Student,
};
use crate::status::EnrollmentStatus;
use crate::store::Store;
use crate::{created, proceeds, validate, AppContext, Created, Input, Param, Payload};

/// An enrollment with whichever relations the caller asked for.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[serde(rename = "estudiante", skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
    #[serde(rename = "curso", skip_serializing_if = "Option::is_none")]
    pub course: Option<Course>,
    #[serde(rename = "asistencias", skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Vec<AttendanceEntry>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Expand {
    pub student: bool,
    pub course: bool,
    /// Attach attendance history, newest first, capped at the given count.
    pub attendance: Option<Option<i64>>,
}

pub async fn expand(
    store: &dyn Store,
    enrollment: Enrollment,
    with: Expand,
) -> Result<EnrollmentView, Error> {
    let student = if with.student {
        store.find_student(enrollment.student_id).await?
    } else {
        None
    };
    let course = if with.course {
        store.find_course(enrollment.course_id).await?
    } else {
        None
    };
    let attendance = match with.attendance {
        Some(limit) => {
            let filter = AttendanceFilter {
                enrollment_id: Some(enrollment.id),
                ..Default::default()
            };
            let rows = store.list_attendance(&filter, limit).await?;
            Some(rows.into_iter().map(AttendanceEntry::from).collect())
        }
        None => None,
    };
    Ok(EnrollmentView {
        enrollment,
        student,
        course,
        attendance,
    })
}

pub async fn expand_all(
    store: &dyn Store,
    enrollments: Vec<Enrollment>,
    with: Expand,
) -> Result<Vec<EnrollmentView>, Error> {
    try_join_all(
        enrollments
            .into_iter()
            .map(|enrollment| expand(store, enrollment, with)),
    )
    .await
}

pub(crate) fn by_surname(views: &mut [EnrollmentView]) {
    views.sort_by(|a, b| match (&a.student, &b.student) {
        (Some(a), Some(b)) => a.name_order(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub async fn enroll(store: &dyn Store, request: CreateEnrollment) -> Result<EnrollmentView, Error> {
    validate::not_enrolled(store, request.student_id, request.course_id).await?;
    let enrollment = store
        .insert_enrollment(&NewEnrollment {
            student_id: request.student_id,
            course_id: request.course_id,
            enrolled_at: request.enrolled_at.unwrap_or_else(Utc::now),
            status: request.status,
        })
        .await?;
    expand(
        store,
        enrollment,
        Expand {
            student: true,
            course: true,
            ..Default::default()
        },
    )
    .await
}

pub async fn all(store: &dyn Store) -> Result<Vec<EnrollmentView>, Error> {
    let enrollments = store.list_enrollments(&EnrollmentFilter::default()).await?;
    expand_all(
        store,
        enrollments,
        Expand {
            student: true,
            course: true,
            ..Default::default()
        },
    )
    .await
}

/// Active enrollments of a course with their students, by surname.
pub async fn of_course(store: &dyn Store, course_id: i32) -> Result<Vec<EnrollmentView>, Error> {
    let filter = EnrollmentFilter {
        course_id: Some(course_id),
        status: Some(EnrollmentStatus::Active),
        ..Default::default()
    };
    let enrollments = store.list_enrollments(&filter).await?;
    let mut views = expand_all(
        store,
        enrollments,
        Expand {
            student: true,
            ..Default::default()
        },
    )
    .await?;
    by_surname(&mut views);
    Ok(views)
}

/// Every enrollment of a student, whatever its status, newest first.
pub async fn of_student(store: &dyn Store, student_id: i32) -> Result<Vec<EnrollmentView>, Error> {
    let filter = EnrollmentFilter {
        student_id: Some(student_id),
        ..Default::default()
    };
    let enrollments = store.list_enrollments(&filter).await?;
    expand_all(
        store,
        enrollments,
        Expand {
            course: true,
            attendance: Some(None),
            ..Default::default()
        },
    )
    .await
}

/// Every enrollment of a student with its course, as shown in student listings.
pub async fn courses_of(store: &dyn Store, student_id: i32) -> Result<Vec<EnrollmentView>, Error> {
    let filter = EnrollmentFilter {
        student_id: Some(student_id),
        ..Default::default()
    };
    let enrollments = store.list_enrollments(&filter).await?;
    expand_all(
        store,
        enrollments,
        Expand {
            course: true,
            ..Default::default()
        },
    )
    .await
}

pub async fn change_status(
    store: &dyn Store,
    id: i32,
    status: Option<EnrollmentStatus>,
) -> Result<EnrollmentView, Error> {
    let enrollment = match status {
        Some(status) => store.set_enrollment_status(id, status).await?,
        None => store.find_enrollment(id).await?,
    }
    .ok_or_else(|| Error::not_found("Inscripción no encontrada"))?;
    expand(
        store,
        enrollment,
        Expand {
            student: true,
            course: true,
            ..Default::default()
        },
    )
    .await
}

pub async fn create_enrollment(
    State(ctx): State<AppContext>,
    Input(request): Input<CreateEnrollment>,
) -> Created<EnrollmentView> {
    created(enroll(ctx.store.as_ref(), request).await?)
}

pub async fn list_enrollments(State(ctx): State<AppContext>) -> Payload<Vec<EnrollmentView>> {
    proceeds(all(ctx.store.as_ref()).await?)
}

pub async fn course_enrollments(
    State(ctx): State<AppContext>,
    Param(course_id): Param<i32>,
) -> Payload<Vec<EnrollmentView>> {
    proceeds(of_course(ctx.store.as_ref(), course_id).await?)
}

pub async fn student_enrollments(
    State(ctx): State<AppContext>,
    Param(student_id): Param<i32>,
) -> Payload<Vec<EnrollmentView>> {
    proceeds(of_student(ctx.store.as_ref(), student_id).await?)
}

pub async fn update_enrollment(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
    Input(request): Input<UpdateEnrollment>,
) -> Payload<EnrollmentView> {
    proceeds(change_status(ctx.store.as_ref(), id, request.status).await?)
}

pub async fn delete_enrollment(
    State(ctx): State<AppContext>,
    Param(id): Param<i32>,
) -> Payload<EnrollmentCancelled> {
    let enrollment = change_status(ctx.store.as_ref(), id, Some(EnrollmentStatus::Inactive)).await?;
    proceeds(EnrollmentCancelled {
        message: "Inscripción cancelada correctamente",
        enrollment,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEnrollment {
    #[serde(rename = "estudianteId")]
    pub student_id: i32,
    #[serde(rename = "cursoId")]
    pub course_id: i32,
    #[serde(rename = "fecha_inscripcion", default)]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(rename = "estadoId", default)]
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateEnrollment {
    #[serde(rename = "estadoId")]
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentCancelled {
    pub message: &'static str,
    #[serde(rename = "inscripcion")]
    pub enrollment: EnrollmentView,
}
