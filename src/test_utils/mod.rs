#![allow(missing_docs)]

pub(crate) mod fetch;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use fetch::{ScriptedFetch, SwitchableFetch, spawn_test_server};
pub(crate) use html::{assert_valid_html, parse_html_document};
pub(crate) use http::{assert_content_type, assert_status_ok};
