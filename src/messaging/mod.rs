// Messaging - commands, notifications and the channels carrying them

pub mod channels;
pub mod command;
pub mod notification;
