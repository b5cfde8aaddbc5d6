//! Checks run before a write. Each one either passes or returns the
//! `Error` the handler should answer with.

use crate::day::DayWindow;
use crate::err::Error;
use crate::models::{AttendanceFilter, Course, Enrollment};
use crate::status::EnrollmentStatus;
use crate::store::Store;

pub async fn student_identity_is_free(
    store: &dyn Store,
    document: Option<&str>,
    email: Option<&str>,
    except: Option<i32>,
) -> Result<(), Error> {
    if document.is_none() && email.is_none() {
        return Ok(());
    }
    match store.find_student_by_identity(document, email, except).await? {
        Some(_) => Err(Error::conflict("El documento o correo ya existe")),
        None => Ok(()),
    }
}

pub async fn course_code_is_free(
    store: &dyn Store,
    code: &str,
    except: Option<i32>,
) -> Result<(), Error> {
    match store.find_course_by_code(code, except).await? {
        Some(_) => Err(Error::conflict("El código de curso ya existe")),
        None => Ok(()),
    }
}

/// Any earlier enrollment counts, cancelled ones included.
pub async fn not_enrolled(store: &dyn Store, student_id: i32, course_id: i32) -> Result<(), Error> {
    match store.find_enrollment_for(student_id, course_id).await? {
        Some(_) => Err(Error::conflict(
            "El estudiante ya está inscrito en este curso",
        )),
        None => Ok(()),
    }
}

pub async fn active_enrollment(store: &dyn Store, id: i32) -> Result<Enrollment, Error> {
    match store.find_enrollment(id).await? {
        Some(enrollment) if enrollment.status == EnrollmentStatus::Active => Ok(enrollment),
        _ => Err(Error::not_found("Inscripción no encontrada o inactiva")),
    }
}

pub async fn existing_course(store: &dyn Store, id: i32) -> Result<Course, Error> {
    store
        .find_course(id)
        .await?
        .ok_or_else(|| Error::not_found("Curso no encontrado"))
}

pub async fn no_attendance_for_enrollment(
    store: &dyn Store,
    enrollment_id: i32,
    window: DayWindow,
) -> Result<(), Error> {
    let filter = AttendanceFilter {
        enrollment_id: Some(enrollment_id),
        ..Default::default()
    }
    .within(window);
    match store.find_attendance(&filter).await? {
        Some(_) => Err(Error::conflict(
            "Ya existe asistencia registrada para esta fecha",
        )),
        None => Ok(()),
    }
}

pub async fn attendance_taken(
    store: &dyn Store,
    course_id: i32,
    window: DayWindow,
) -> Result<bool, Error> {
    let filter = AttendanceFilter {
        course_id: Some(course_id),
        ..Default::default()
    }
    .within(window);
    Ok(store.find_attendance(&filter).await?.is_some())
}

pub async fn no_attendance_for_course(
    store: &dyn Store,
    course_id: i32,
    window: DayWindow,
) -> Result<(), Error> {
    if attendance_taken(store, course_id, window).await? {
        return Err(Error::conflict(
            "Ya existe asistencia registrada para esta fecha y curso",
        ));
    }
    Ok(())
}
