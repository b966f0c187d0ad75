pub mod check;
pub mod equiv;
pub mod grade;
pub mod init;
pub mod parse;
pub mod validate;
