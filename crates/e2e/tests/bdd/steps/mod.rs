mod database_steps;
mod login_steps;
mod search_steps;
