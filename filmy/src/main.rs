//! filmy - Browse movies, manage favorites and write reviews on Filmy Talks
//!
//! Each command dispatches request actions into the client store, waits for
//! the effects to settle, persists the resulting state and prints it.

use clap::{Parser, Subcommand};
use libfilmy::logging::LoggingConfig;
use libfilmy::store::selectors::{is_favorite, movies_by_status, reviews_for_movie, ReviewView};
use libfilmy::store::{ReviewSync, RootState};
use libfilmy::validation::{validate_login, validate_signup};
use libfilmy::{
    Action, Config, FilmyApp, FilmyError, Movie, ReleaseStatus, Result, ReviewDraft, User,
};
use serde_json::json;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "filmy")]
#[command(version)]
#[command(about = "Browse movies, manage favorites and write reviews")]
#[command(long_about = "\
filmy - Command-line client for Filmy Talks

COMMANDS:
    login       Sign in and remember the session
    signup      Create an account and sign in
    logout      Forget the current session
    whoami      Show the signed-in user and check the session with the server
    movies      List the catalog
    movie       Show one movie with its reviews
    favorites   List, add or remove favorite movies
    review      Review a movie

USAGE EXAMPLES:
    filmy login ada@example.com --password secret1
    filmy movies --status now-showing --search dune
    filmy favorites add 64f0c2
    filmy review 64f0c2 --rating 4.5 --comment \"Loved it\"
    filmy movies --format json | jq '.[].name'

CONFIGURATION:
    Configuration file: ~/.config/filmy/config.toml
    Session state:      ~/.local/share/filmy/state.db

    Override with environment variables:
        FILMY_CONFIG      - Path to config file
        FILMY_API_URL     - Base URL of the movie service
        FILMY_PASSWORD    - Password for login and signup
        FILMY_LOG_LEVEL   - Log level (default: warn)
        FILMY_LOG_FORMAT  - Log format: text, json or pretty

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Authentication error
    3 - Invalid input
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in
    Login {
        email: String,

        #[arg(long, env = "FILMY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account, then sign in with it
    Signup {
        /// Display name
        full_name: String,

        email: String,

        #[arg(long, env = "FILMY_PASSWORD", hide_env_values = true)]
        password: String,

        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Forget the current session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List movies
    Movies {
        /// Only movies with this status (past, now-showing, upcoming)
        #[arg(short, long, value_parser = parse_status)]
        status: Option<ReleaseStatus>,

        /// Case-insensitive substring of the movie name
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one movie
    Movie { id: String },

    /// Manage favorites (lists them when no action is given)
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Review a movie
    Review {
        movie_id: String,

        /// 0 to 5
        #[arg(short, long)]
        rating: f64,

        #[arg(short, long)]
        comment: String,
    },
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
    List,
    Add { movie_id: String },
    Remove { movie_id: String },
}

fn parse_status(s: &str) -> std::result::Result<ReleaseStatus, String> {
    s.parse()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Bad input never reaches the config, the disk or the network
    check_input(&cli.command)?;

    let config = Config::load_or_default()?;
    let app = FilmyApp::from_config(config).await?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Login { email, password } => cmd_login(&app, email, password, json).await,
        Commands::Signup {
            full_name,
            email,
            password,
            ..
        } => cmd_signup(&app, full_name, email, password, json).await,
        Commands::Logout => cmd_logout(&app, json).await,
        Commands::Whoami => cmd_whoami(&app, json).await,
        Commands::Movies { status, search } => {
            cmd_movies(&app, status, search.as_deref().unwrap_or_default(), json).await
        }
        Commands::Movie { id } => cmd_movie(&app, &id, json).await,
        Commands::Favorites { action } => {
            cmd_favorites(&app, action.unwrap_or(FavoritesAction::List), json).await
        }
        Commands::Review {
            movie_id,
            rating,
            comment,
        } => cmd_review(&app, movie_id, rating, comment, json).await,
    }
}

fn check_input(command: &Commands) -> Result<()> {
    let messages: Vec<String> = match command {
        Commands::Login { email, password } => validate_login(email, password)
            .messages()
            .into_iter()
            .map(str::to_string)
            .collect(),
        Commands::Signup {
            full_name,
            email,
            password,
            confirm_password,
        } => {
            let confirm = confirm_password.as_deref().unwrap_or(password);
            validate_signup(full_name.trim(), email, password, confirm)
                .messages()
                .into_iter()
                .map(str::to_string)
                .collect()
        }
        Commands::Review {
            rating, comment, ..
        } => {
            let mut messages = Vec::new();
            if !(0.0..=5.0).contains(rating) {
                messages.push("Rating must be between 0 and 5".to_string());
            }
            if comment.trim().is_empty() {
                messages.push("Comment is required".to_string());
            }
            messages
        }
        _ => Vec::new(),
    };

    if messages.is_empty() {
        Ok(())
    } else {
        Err(FilmyError::InvalidInput(messages.join("; ")))
    }
}

fn require_user(state: &RootState) -> Result<User> {
    state
        .auth
        .user
        .clone()
        .filter(User::has_token)
        .ok_or_else(|| {
            FilmyError::Authentication("Not signed in. Run `filmy login` first".to_string())
        })
}

async fn cmd_login(app: &FilmyApp, email: String, password: String, json: bool) -> Result<()> {
    app.dispatch(Action::LoginRequest { email, password });
    app.settle().await;
    finish_sign_in(app, json).await
}

async fn cmd_signup(
    app: &FilmyApp,
    full_name: String,
    email: String,
    password: String,
    json: bool,
) -> Result<()> {
    app.dispatch(Action::SignupRequest {
        full_name: full_name.trim().to_string(),
        email,
        password,
    });
    app.settle().await;
    finish_sign_in(app, json).await
}

async fn finish_sign_in(app: &FilmyApp, json: bool) -> Result<()> {
    let state = app.state();
    if let Some(error) = state.auth.error {
        return Err(FilmyError::Authentication(error));
    }
    let user = require_user(&state)?;
    app.persist().await?;

    if json {
        print_json(&user_json(&user));
    } else {
        println!("Signed in as {} <{}>", user.first_name(), user.email);
        if let Some(error) = state.favorite.fetch.error {
            eprintln!("Warning: could not load favorites: {}", error);
        }
    }
    Ok(())
}

async fn cmd_logout(app: &FilmyApp, json: bool) -> Result<()> {
    app.dispatch(Action::Logout);
    app.persist().await?;

    if json {
        print_json(&json!({ "signed_in": false }));
    } else {
        println!("Signed out");
    }
    Ok(())
}

async fn cmd_whoami(app: &FilmyApp, json: bool) -> Result<()> {
    let user = require_user(&app.state())?;
    let valid = app.validate_token().await?;
    debug!("Session for {} valid: {}", user.email, valid);

    if json {
        let mut value = user_json(&user);
        value["session_valid"] = json!(valid);
        print_json(&value);
    } else {
        println!("{} <{}>", user.full_name, user.email);
        println!("Favorites: {}", user.favorites.len());
        if !valid {
            println!("Session expired. Run `filmy login` again");
        }
    }

    if valid {
        Ok(())
    } else {
        Err(FilmyError::Authentication("Session expired".to_string()))
    }
}

async fn cmd_movies(
    app: &FilmyApp,
    status: Option<ReleaseStatus>,
    search: &str,
    json: bool,
) -> Result<()> {
    app.dispatch(Action::FetchMoviesRequest);
    app.settle().await;

    let state = app.state();
    if let Some(error) = &state.movie.error {
        return Err(FilmyError::Operation(error.clone()));
    }
    app.persist().await?;

    let statuses: Vec<ReleaseStatus> = match status {
        Some(status) => vec![status],
        None => ReleaseStatus::ALL.to_vec(),
    };
    let movies: Vec<&Movie> = statuses
        .into_iter()
        .flat_map(|status| movies_by_status(&state.movie.movies, status, search))
        .collect();

    if json {
        print_json(&json!(movies));
        return Ok(());
    }

    if movies.is_empty() {
        println!("No movies found");
    }
    for movie in movies {
        println!(
            "{} {} | {} ({}) | {} | {}",
            if is_favorite(&state, &movie.id) { "*" } else { " " },
            movie.id,
            movie.name,
            movie.release_year,
            movie.status,
            movie.category
        );
    }
    Ok(())
}

async fn cmd_movie(app: &FilmyApp, id: &str, json: bool) -> Result<()> {
    let movie = app.get_movie(id).await?;
    let state = app.state();
    let reviews = reviews_for_movie(&state, &movie);

    if json {
        print_json(&json!({
            "movie": movie,
            "favorite": is_favorite(&state, &movie.id),
            "reviews": reviews.iter().map(review_json).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    println!("{} ({})", movie.name, movie.release_year);
    println!("{} | {}", movie.status, movie.category);
    if let Some(director) = &movie.director {
        println!("Director: {}", director);
    }
    if let Some(rating) = movie.rating {
        println!("Rating: {:.1}", rating);
    }
    if !movie.cast.is_empty() {
        println!("Cast: {}", movie.cast.join(", "));
    }
    if let Some(description) = &movie.description {
        println!();
        println!("{}", description);
    }

    println!();
    if reviews.is_empty() {
        println!("No reviews yet");
    }
    for view in &reviews {
        println!(
            "{} - {:.1}/5{}",
            view.review.author_name,
            view.review.rating,
            match view.sync {
                Some(ReviewSync::Pending) => " (pending)",
                Some(ReviewSync::Failed) => " (not sent)",
                _ => "",
            }
        );
        println!("  {}", view.review.comment);
    }
    Ok(())
}

async fn cmd_favorites(app: &FilmyApp, action: FavoritesAction, json: bool) -> Result<()> {
    require_user(&app.state())?;

    let action = match action {
        FavoritesAction::List => Action::FetchFavoritesRequest,
        FavoritesAction::Add { movie_id } => Action::AddFavoriteRequest(movie_id),
        FavoritesAction::Remove { movie_id } => Action::RemoveFavoriteRequest(movie_id),
    };
    app.dispatch(action);
    app.settle().await;

    let state = app.state();
    if let Some(error) = state.favorite.error() {
        return Err(FilmyError::Operation(error.to_string()));
    }
    app.persist().await?;

    if json {
        print_json(&json!(state.favorite.favorites));
        return Ok(());
    }

    if state.favorite.favorites.is_empty() {
        println!("No favorites");
    }
    for movie in &state.favorite.favorites {
        println!("{} | {} ({})", movie.id, movie.name, movie.release_year);
    }
    Ok(())
}

async fn cmd_review(
    app: &FilmyApp,
    movie_id: String,
    rating: f64,
    comment: String,
    json: bool,
) -> Result<()> {
    let user = require_user(&app.state())?;
    let draft = ReviewDraft::for_user(&user, movie_id, rating, comment.trim());
    let local_id = draft.local_id.clone();
    let movie_id = draft.movie_id.clone();

    app.dispatch(Action::AddReviewRequest(draft));
    app.settle().await;

    let state = app.state();
    let sync = state
        .review
        .for_movie(&movie_id)
        .iter()
        .find(|r| r.local_id == local_id)
        .map(|r| r.sync);
    app.persist().await?;

    if sync != Some(ReviewSync::Confirmed) {
        let error = state
            .review
            .error
            .unwrap_or_else(|| "Review was not accepted".to_string());
        return Err(FilmyError::Operation(error));
    }

    if json {
        print_json(&json!({ "movie_id": movie_id, "rating": rating, "accepted": true }));
    } else {
        println!("Review for {} posted", movie_id);
    }
    Ok(())
}

fn user_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "full_name": user.full_name,
        "email": user.email,
        "favorites": user.favorites,
    })
}

fn review_json(view: &ReviewView) -> serde_json::Value {
    json!({
        "author": view.review.author_name,
        "rating": view.review.rating,
        "comment": view.review.comment,
        "mine": view.mine,
        "pending": view.sync == Some(ReviewSync::Pending),
    })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: could not encode output: {}", e),
    }
}
