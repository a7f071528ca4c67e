mod food;
mod goal;
mod helpers;
mod info;
mod intake;

pub(crate) use food::{cmd_food_add, cmd_food_lookup};
pub(crate) use goal::{cmd_goal_set, cmd_goal_show};
pub(crate) use info::cmd_info;
pub(crate) use intake::{cmd_log, cmd_meals};
