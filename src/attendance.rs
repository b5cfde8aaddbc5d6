//! Attendance marking.
//!
//! A class day is a local calendar day (see [`crate::day`]). An enrollment
//! gets at most one record per day, and a course gets at most one bulk
//! submission per day. Both rules are checked once before writing; the bulk
//! writes themselves run concurrently and are not wrapped in a transaction,
//! so two racing submissions can both pass the check.

use std::cmp::Ordering;

use axum::extract::State;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::day::{ClassDate, DayWindow};
use crate::enrollments;
use crate::err::Error;
use crate::models::{
    Attendance, AttendanceFilter, CourseSummary, Enrollment, NewAttendance, StudentSummary,
};
use crate::status::{AttendanceStatus, StatusLabel};
use crate::store::Store;
use crate::{created, proceeds, validate, AppContext, Created, Input, Param, Payload};

/// Expands an attendance row with its status, enrollment and the people behind it.
pub async fn expand(store: &dyn Store, attendance: Attendance) -> Result<AttendanceRecord, Error> {
    let enrollment = store.find_enrollment(attendance.enrollment_id).await?;
    let (student, course) = match &enrollment {
        Some(enrollment) => (
            store.find_student(enrollment.student_id).await?,
            store.find_course(enrollment.course_id).await?,
        ),
        None => (None, None),
    };
    let recorder = store.find_user(attendance.recorded_by).await?;
    Ok(AttendanceRecord {
        status: attendance.status.expanded(),
        attendance,
        enrollment,
        student: student.as_ref().map(StudentSummary::from),
        course: course.as_ref().map(CourseSummary::from),
        recorded_by: recorder.map(|user| user.full_name),
    })
}

pub async fn mark_single(
    store: &dyn Store,
    request: MarkAttendance,
) -> Result<AttendanceRecord, Error> {
    let class_date = ClassDate::parse(&request.class_date)?;
    let enrollment = validate::active_enrollment(store, request.enrollment_id).await?;
    validate::no_attendance_for_enrollment(store, enrollment.id, class_date.window()).await?;

    let attendance = store
        .insert_attendance(&NewAttendance {
            enrollment_id: enrollment.id,
            class_date: class_date.at,
            recorded_by: request.recorded_by,
            status: request.status,
            notes: request.notes.unwrap_or_default(),
        })
        .await?;
    expand(store, attendance).await
}

pub async fn mark_class(store: &dyn Store, request: MarkClass) -> Result<ClassMarked, Error> {
    let class_date = ClassDate::parse(&request.class_date)?;
    let course = validate::existing_course(store, request.course_id).await?;
    validate::no_attendance_for_course(store, course.id, class_date.window()).await?;

    let (at, recorded_by) = (class_date.at, request.recorded_by);
    let writes = request.entries.iter().map(|entry| async move {
        let attendance = store
            .insert_attendance(&NewAttendance {
                enrollment_id: entry.enrollment_id,
                class_date: at,
                recorded_by,
                status: entry.status,
                notes: entry.notes.clone().unwrap_or_default(),
            })
            .await?;
        expand(store, attendance).await
    });
    let records = try_join_all(writes).await.map_err(|err| {
        log::warn!(
            "Bulk attendance for course {} on {} failed: {}",
            course.id,
            class_date.day,
            err
        );
        Error::invalid(format!(
            "No se pudo registrar la asistencia de la clase: {}",
            err.message()
        ))
    })?;

    Ok(ClassMarked {
        message: "Asistencia registrada correctamente para toda la clase",
        course: course.name,
        date: request.class_date,
        total: records.len(),
        records,
    })
}

pub async fn taken_on(store: &dyn Store, course_id: i32, day: NaiveDate) -> Result<bool, Error> {
    validate::attendance_taken(store, course_id, DayWindow::local(day)).await
}

/// Every record of the course on that day, by student surname.
pub async fn course_day(
    store: &dyn Store,
    course_id: i32,
    day: NaiveDate,
) -> Result<Vec<AttendanceRecord>, Error> {
    let filter = AttendanceFilter {
        course_id: Some(course_id),
        ..Default::default()
    }
    .within(DayWindow::local(day));
    let rows = store.list_attendance(&filter, None).await?;
    let mut records = try_join_all(rows.into_iter().map(|row| expand(store, row))).await?;
    records.sort_by(|a, b| match (&a.student, &b.student) {
        (Some(a), Some(b)) => a.name_order(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(records)
}

/// Students that can be marked in a course: its active enrollments.
pub async fn roster(store: &dyn Store, course_id: i32) -> Result<Vec<RosterEntry>, Error> {
    let views = enrollments::of_course(store, course_id).await?;
    Ok(views
        .into_iter()
        .filter_map(|view| {
            let student = view.student.as_ref()?;
            Some(RosterEntry {
                enrollment_id: view.enrollment.id,
                student: StudentSummary::from(student),
                enrolled_at: view.enrollment.enrolled_at,
            })
        })
        .collect())
}

pub async fn attendance_roster(
    State(ctx): State<AppContext>,
    Param(course_id): Param<i32>,
) -> Payload<Vec<RosterEntry>> {
    proceeds(roster(ctx.store.as_ref(), course_id).await?)
}

pub async fn mark_attendance(
    State(ctx): State<AppContext>,
    Input(request): Input<MarkAttendance>,
) -> Created<AttendanceRecord> {
    created(mark_single(ctx.store.as_ref(), request).await?)
}

pub async fn mark_class_attendance(
    State(ctx): State<AppContext>,
    Input(request): Input<MarkClass>,
) -> Created<ClassMarked> {
    created(mark_class(ctx.store.as_ref(), request).await?)
}

pub async fn course_attendance_on(
    State(ctx): State<AppContext>,
    Param((course_id, day)): Param<(i32, NaiveDate)>,
) -> Payload<Vec<AttendanceRecord>> {
    proceeds(course_day(ctx.store.as_ref(), course_id, day).await?)
}

pub async fn verify_attendance(
    State(ctx): State<AppContext>,
    Param((course_id, day)): Param<(i32, NaiveDate)>,
) -> Payload<AttendanceExists> {
    let exists = taken_on(ctx.store.as_ref(), course_id, day).await?;
    proceeds(AttendanceExists { exists })
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkAttendance {
    #[serde(rename = "inscripcionId")]
    pub enrollment_id: i32,
    #[serde(rename = "fecha_clase")]
    pub class_date: String,
    #[serde(rename = "usuarioId")]
    pub recorded_by: i32,
    #[serde(rename = "estadoId")]
    pub status: AttendanceStatus,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkClass {
    #[serde(rename = "cursoId")]
    pub course_id: i32,
    #[serde(rename = "fecha_clase")]
    pub class_date: String,
    #[serde(rename = "usuarioId")]
    pub recorded_by: i32,
    #[serde(rename = "asistencias")]
    pub entries: Vec<ClassEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassEntry {
    #[serde(rename = "inscripcionId")]
    pub enrollment_id: i32,
    #[serde(rename = "estadoId")]
    pub status: AttendanceStatus,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    #[serde(flatten)]
    pub attendance: Attendance,
    #[serde(rename = "estado")]
    pub status: StatusLabel,
    #[serde(rename = "inscripcion")]
    pub enrollment: Option<Enrollment>,
    #[serde(rename = "estudiante")]
    pub student: Option<StudentSummary>,
    #[serde(rename = "curso")]
    pub course: Option<CourseSummary>,
    #[serde(rename = "registrado_por")]
    pub recorded_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassMarked {
    pub message: &'static str,
    #[serde(rename = "curso")]
    pub course: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "total_estudiantes")]
    pub total: usize,
    #[serde(rename = "asistencias")]
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    #[serde(rename = "inscripcionId")]
    pub enrollment_id: i32,
    #[serde(rename = "estudiante")]
    pub student: StudentSummary,
    #[serde(rename = "fecha_inscripcion")]
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceExists {
    #[serde(rename = "existe")]
    pub exists: bool,
}
