//! Discord integration - gateway bot that turns CSV uploads into threads
//!
//! This crate connects the sheet pipeline in `threadloom-core` to Discord:
//! - **Gateway** (`gateway`) - serenity session with reconnect backoff
//! - **Upload handling** (`upload`) - filters mentions, fetches and parses the sheet
//! - **Dispatch** (`dispatch`) - resolves channels, opens threads, posts chunks
//! - **Platform seam** (`platform`, `rest`, `fetch`) - traits plus the REST and HTTP backends
//!
//! # Getting Started
//!
//! 1. Create an application and bot user at https://discord.com/developers/applications
//! 2. Enable the Message Content privileged intent
//! 3. Invite the bot with Create Public Threads and Send Messages in Threads
//! 4. Set `DISCORD_TOKEN` (or `THREADLOOM_DISCORD_TOKEN`)
//!
//! # Architecture
//!
//! ```text
//! Gateway → GatewayBridge → UploadHandler → ThreadPlan → ThreadDispatcher → ResearchPlatform
//!                                ↓
//!                        AttachmentFetcher
//! ```

pub mod dispatch;
pub mod events;
pub mod fetch;
pub mod gateway;
pub mod platform;
pub mod rest;
pub mod upload;
