//! Persistence primitives.
//!
//! Handlers never talk to the database directly: they hold an
//! `Arc<dyn Store>` and compose these calls. Unique and foreign-key
//! violations come back as [`Error::Conflict`] and
//! [`Error::InvalidPayload`] respectively.

use async_trait::async_trait;

use crate::err::Error;
use crate::models::{
    Attendance, AttendanceFilter, Course, CoursePatch, Enrollment, EnrollmentFilter,
    NewAttendance, NewCourse, NewEnrollment, NewStudent, Student, StudentFilter, StudentPatch,
    User,
};
use crate::status::{CourseStatus, EnrollmentStatus};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_student(&self, student: &NewStudent) -> Result<Student, Error>;

    async fn find_student(&self, id: i32) -> Result<Option<Student>, Error>;

    /// Any student other than `except` holding `document` or `email`.
    async fn find_student_by_identity(
        &self,
        document: Option<&str>,
        email: Option<&str>,
        except: Option<i32>,
    ) -> Result<Option<Student>, Error>;

    /// Students matching `filter`, ordered by surname.
    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>, Error>;

    /// `None` when no student has that id.
    async fn update_student(&self, id: i32, patch: &StudentPatch)
        -> Result<Option<Student>, Error>;

    async fn insert_course(&self, course: &NewCourse) -> Result<Course, Error>;

    async fn find_course(&self, id: i32) -> Result<Option<Course>, Error>;

    async fn find_course_by_code(
        &self,
        code: &str,
        except: Option<i32>,
    ) -> Result<Option<Course>, Error>;

    /// All courses by start date, newest first, or only those in `status`
    /// ordered by name.
    async fn list_courses(&self, status: Option<CourseStatus>) -> Result<Vec<Course>, Error>;

    async fn update_course(&self, id: i32, patch: &CoursePatch) -> Result<Option<Course>, Error>;

    async fn find_user(&self, id: i32) -> Result<Option<User>, Error>;

    async fn insert_enrollment(&self, enrollment: &NewEnrollment) -> Result<Enrollment, Error>;

    async fn find_enrollment(&self, id: i32) -> Result<Option<Enrollment>, Error>;

    /// The enrollment of `student_id` in `course_id`, whatever its status.
    async fn find_enrollment_for(
        &self,
        student_id: i32,
        course_id: i32,
    ) -> Result<Option<Enrollment>, Error>;

    /// Newest first.
    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, Error>;

    async fn set_enrollment_status(
        &self,
        id: i32,
        status: EnrollmentStatus,
    ) -> Result<Option<Enrollment>, Error>;

    async fn insert_attendance(&self, attendance: &NewAttendance) -> Result<Attendance, Error>;

    async fn find_attendance(&self, filter: &AttendanceFilter) -> Result<Option<Attendance>, Error>;

    /// Most recent class first, at most `limit` rows when given.
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Attendance>, Error>;

    async fn close(&self) {}
}
