//! Server-rendered pages for visitors and job seekers. Form posts answer
//! with a redirect and a one-shot flash message.

pub mod flash;
pub mod handlers;
pub mod views;
