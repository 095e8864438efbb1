//! Thin client for a tic-tac-toe game hosted by a remote peer.
//!
//! The peer owns the rules and the opponent. This crate keeps one WebSocket
//! channel to it ([`ws`]), reconciles what it reports into a local view of
//! the game ([`session`]), and renders that view in a terminal ([`ui`]).

pub mod config;
pub mod game;
pub mod session;
pub mod ui;
pub mod ws;
