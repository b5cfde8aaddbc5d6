//! In-process [`Store`] that mirrors the schema's unique and foreign-key
//! constraints, so workflows can be exercised without a database.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::err::Error;
use crate::models::{
    Attendance, AttendanceFilter, Course, CoursePatch, Enrollment, EnrollmentFilter,
    NewAttendance, NewCourse, NewEnrollment, NewStudent, Student, StudentFilter, StudentPatch,
    User,
};
use crate::status::{CourseStatus, EnrollmentStatus};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    students: Vec<Student>,
    courses: Vec<Course>,
    enrollments: Vec<Enrollment>,
    attendance: Vec<Attendance>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn unique_violation(constraint: &str) -> Error {
    Error::conflict(format!(
        "duplicate key value violates unique constraint \"{}\"",
        constraint
    ))
}

fn foreign_key_violation(constraint: &str) -> Error {
    Error::invalid(format!(
        "insert or update violates foreign key constraint \"{}\"",
        constraint
    ))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, full_name: &str, email: &str) -> User {
        let mut tables = self.tables.lock().unwrap();
        let user = User {
            id: tables.users.len() as i32 + 1,
            full_name: full_name.to_string(),
            email: email.to_string(),
        };
        tables.users.push(user.clone());
        user
    }

    pub fn attendance_count(&self) -> usize {
        self.tables.lock().unwrap().attendance.len()
    }
}

impl Tables {
    fn student_clash(&self, document: &str, email: &str, except: Option<i32>) -> Option<&str> {
        self.students
            .iter()
            .filter(|s| Some(s.id) != except)
            .find_map(|s| {
                if s.document_number == document {
                    Some("students_document_number_key")
                } else if s.email == email {
                    Some("students_email_key")
                } else {
                    None
                }
            })
    }

    fn has_user(&self, id: i32) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn course_of_enrollment(&self, enrollment_id: i32) -> Option<i32> {
        self.enrollments
            .iter()
            .find(|e| e.id == enrollment_id)
            .map(|e| e.course_id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_student(&self, student: &NewStudent) -> Result<Student, Error> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(constraint) =
            tables.student_clash(&student.document_number, &student.email, None)
        {
            return Err(unique_violation(constraint));
        }
        let row = Student {
            id: tables.students.len() as i32 + 1,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            document_type: student.document_type.clone(),
            document_number: student.document_number.clone(),
            birth_date: student.birth_date,
            email: student.email.clone(),
            phone: student.phone.clone(),
            city: student.city.clone(),
            status: student.status,
        };
        tables.students.push(row.clone());
        Ok(row)
    }

    async fn find_student(&self, id: i32) -> Result<Option<Student>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_by_identity(
        &self,
        document: Option<&str>,
        email: Option<&str>,
        except: Option<i32>,
    ) -> Result<Option<Student>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .students
            .iter()
            .filter(|s| Some(s.id) != except)
            .find(|s| {
                Some(s.document_number.as_str()) == document || Some(s.email.as_str()) == email
            })
            .cloned())
    }

    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>, Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Student> = tables
            .students
            .iter()
            .filter(|s| {
                filter.name.as_deref().map_or(true, |name| {
                    contains_ignore_case(&s.first_name, name)
                        || contains_ignore_case(&s.last_name, name)
                }) && filter
                    .document
                    .as_deref()
                    .map_or(true, |doc| s.document_number.contains(doc))
                    && filter
                        .email
                        .as_deref()
                        .map_or(true, |email| contains_ignore_case(&s.email, email))
                    && filter.status.map_or(true, |status| s.status == status)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name_order(b));
        Ok(rows)
    }

    async fn update_student(
        &self,
        id: i32,
        patch: &StudentPatch,
    ) -> Result<Option<Student>, Error> {
        let mut tables = self.tables.lock().unwrap();
        let current = match tables.students.iter().find(|s| s.id == id) {
            Some(student) => student.clone(),
            None => return Ok(None),
        };
        let document = patch
            .document_number
            .as_deref()
            .unwrap_or(&current.document_number);
        let email = patch.email.as_deref().unwrap_or(&current.email);
        if let Some(constraint) = tables.student_clash(document, email, Some(id)) {
            return Err(unique_violation(constraint));
        }

        let row = tables
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .expect("student looked up above");
        if let Some(v) = &patch.first_name {
            row.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            row.last_name = v.clone();
        }
        if let Some(v) = &patch.document_type {
            row.document_type = v.clone();
        }
        if let Some(v) = &patch.document_number {
            row.document_number = v.clone();
        }
        if let Some(v) = patch.birth_date {
            row.birth_date = v;
        }
        if let Some(v) = &patch.email {
            row.email = v.clone();
        }
        if let Some(v) = &patch.phone {
            row.phone = Some(v.clone());
        }
        if let Some(v) = &patch.city {
            row.city = Some(v.clone());
        }
        if let Some(v) = patch.status {
            row.status = v;
        }
        Ok(Some(row.clone()))
    }

    async fn insert_course(&self, course: &NewCourse) -> Result<Course, Error> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.has_user(course.instructor_id) {
            return Err(foreign_key_violation("courses_instructor_id_fkey"));
        }
        if tables.courses.iter().any(|c| c.code == course.code) {
            return Err(unique_violation("courses_code_key"));
        }
        let row = Course {
            id: tables.courses.len() as i32 + 1,
            code: course.code.clone(),
            name: course.name.clone(),
            level: course.level.clone(),
            description: course.description.clone(),
            duration: course.duration,
            modality: course.modality.clone(),
            price: course.price,
            start_date: course.start_date,
            end_date: course.end_date,
            instructor_id: course.instructor_id,
            status: course.status,
        };
        tables.courses.push(row.clone());
        Ok(row)
    }

    async fn find_course(&self, id: i32) -> Result<Option<Course>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn find_course_by_code(
        &self,
        code: &str,
        except: Option<i32>,
    ) -> Result<Option<Course>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .courses
            .iter()
            .find(|c| c.code == code && Some(c.id) != except)
            .cloned())
    }

    async fn list_courses(&self, status: Option<CourseStatus>) -> Result<Vec<Course>, Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Course> = tables
            .courses
            .iter()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        match status {
            None => rows.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id))),
            Some(_) => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        Ok(rows)
    }

    async fn update_course(&self, id: i32, patch: &CoursePatch) -> Result<Option<Course>, Error> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(instructor) = patch.instructor_id {
            if !tables.has_user(instructor) {
                return Err(foreign_key_violation("courses_instructor_id_fkey"));
            }
        }
        if let Some(code) = &patch.code {
            if tables.courses.iter().any(|c| &c.code == code && c.id != id) {
                return Err(unique_violation("courses_code_key"));
            }
        }
        let row = match tables.courses.iter_mut().find(|c| c.id == id) {
            Some(row) => row,
            None => return Ok(None),
        };
        if let Some(v) = &patch.code {
            row.code = v.clone();
        }
        if let Some(v) = &patch.name {
            row.name = v.clone();
        }
        if let Some(v) = &patch.level {
            row.level = v.clone();
        }
        if let Some(v) = &patch.description {
            row.description = Some(v.clone());
        }
        if let Some(v) = patch.duration {
            row.duration = v;
        }
        if let Some(v) = &patch.modality {
            row.modality = v.clone();
        }
        if let Some(v) = patch.price {
            row.price = v;
        }
        if let Some(v) = patch.start_date {
            row.start_date = v;
        }
        if let Some(v) = patch.end_date {
            row.end_date = v;
        }
        if let Some(v) = patch.instructor_id {
            row.instructor_id = v;
        }
        if let Some(v) = patch.status {
            row.status = v;
        }
        Ok(Some(row.clone()))
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_enrollment(&self, enrollment: &NewEnrollment) -> Result<Enrollment, Error> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.students.iter().any(|s| s.id == enrollment.student_id) {
            return Err(foreign_key_violation("enrollments_student_id_fkey"));
        }
        if !tables.courses.iter().any(|c| c.id == enrollment.course_id) {
            return Err(foreign_key_violation("enrollments_course_id_fkey"));
        }
        if tables
            .enrollments
            .iter()
            .any(|e| e.student_id == enrollment.student_id && e.course_id == enrollment.course_id)
        {
            return Err(unique_violation("enrollments_student_id_course_id_key"));
        }
        let row = Enrollment {
            id: tables.enrollments.len() as i32 + 1,
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            enrolled_at: enrollment.enrolled_at,
            status: enrollment.status,
        };
        tables.enrollments.push(row.clone());
        Ok(row)
    }

    async fn find_enrollment(&self, id: i32) -> Result<Option<Enrollment>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.enrollments.iter().find(|e| e.id == id).cloned())
    }

    async fn find_enrollment_for(
        &self,
        student_id: i32,
        course_id: i32,
    ) -> Result<Option<Enrollment>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Enrollment> = tables
            .enrollments
            .iter()
            .filter(|e| {
                filter.student_id.map_or(true, |id| e.student_id == id)
                    && filter.course_id.map_or(true, |id| e.course_id == id)
                    && filter.status.map_or(true, |status| e.status == status)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn set_enrollment_status(
        &self,
        id: i32,
        status: EnrollmentStatus,
    ) -> Result<Option<Enrollment>, Error> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .enrollments
            .iter_mut()
            .find(|e| e.id == id)
            .map(|row| {
                row.status = status;
                row.clone()
            }))
    }

    async fn insert_attendance(&self, attendance: &NewAttendance) -> Result<Attendance, Error> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .course_of_enrollment(attendance.enrollment_id)
            .is_none()
        {
            return Err(foreign_key_violation("attendance_enrollment_id_fkey"));
        }
        if !tables.has_user(attendance.recorded_by) {
            return Err(foreign_key_violation("attendance_recorded_by_fkey"));
        }
        let row = Attendance {
            id: tables.attendance.len() as i32 + 1,
            enrollment_id: attendance.enrollment_id,
            class_date: attendance.class_date,
            recorded_by: attendance.recorded_by,
            status: attendance.status,
            notes: attendance.notes.clone(),
        };
        tables.attendance.push(row.clone());
        Ok(row)
    }

    async fn find_attendance(&self, filter: &AttendanceFilter) -> Result<Option<Attendance>, Error> {
        let mut rows = self.list_attendance(filter, Some(1)).await?;
        Ok(rows.pop())
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Attendance>, Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Attendance> = tables
            .attendance
            .iter()
            .filter(|a| {
                tables
                    .course_of_enrollment(a.enrollment_id)
                    .map_or(false, |course_id| filter.matches(a, course_id))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.class_date.cmp(&a.class_date).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }
}
