mod dispatcher;
mod server;
