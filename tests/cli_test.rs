//! CLI Command Tests
//!
//! Argument parsing for every subcommand, the JSON envelope, and command
//! handlers against a mocked upstream. Handlers that touch the user's store
//! are left to the store tests.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use dracin::cli::{Cli, Command, HomeSection, PlayerChoice};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dracin").chain(args.iter().copied())).unwrap()
    }

    fn parse_err(args: &[&str]) -> clap::Error {
        Cli::try_parse_from(std::iter::once("dracin").chain(args.iter().copied())).unwrap_err()
    }

    #[test]
    fn test_search_alias_and_limit() {
        let cli = parse(&["s", "hidden heiress", "-l", "5"]);
        match cli.command {
            Some(Command::Search(cmd)) => {
                assert_eq!(cmd.query, "hidden heiress");
                assert_eq!(cmd.limit, 5);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_search_requires_query() {
        let err = parse_err(&["search"]);
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_suggest() {
        let cli = parse(&["suggest", "ce"]);
        assert!(matches!(cli.command, Some(Command::Suggest(ref cmd)) if cmd.query == "ce"));
    }

    #[test]
    fn test_home_sections() {
        for (arg, expected) in [
            ("banners", HomeSection::Banners),
            ("trending", HomeSection::Trending),
            ("latest", HomeSection::Latest),
            ("top-today", HomeSection::TopToday),
            ("genres", HomeSection::Genres),
        ] {
            match parse(&["home", "-s", arg]).command {
                Some(Command::Home(cmd)) => assert_eq!(cmd.section, Some(expected)),
                _ => panic!("Expected Home command"),
            }
        }
        assert!(Cli::try_parse_from(["dracin", "home", "-s", "yesterday"]).is_err());
    }

    #[test]
    fn test_trending_and_latest_paging() {
        match parse(&["tr", "-p", "2", "-l", "3"]).command {
            Some(Command::Trending(cmd)) => {
                assert_eq!(cmd.page, 2);
                assert_eq!(cmd.limit, 3);
            }
            _ => panic!("Expected Trending command"),
        }
        match parse(&["latest"]).command {
            Some(Command::Latest(cmd)) => {
                assert_eq!(cmd.page, 1);
                assert_eq!(cmd.limit, 20);
            }
            _ => panic!("Expected Latest command"),
        }
    }

    #[test]
    fn test_info_and_episodes() {
        assert!(matches!(
            parse(&["i", "41000102345"]).command,
            Some(Command::Info(ref cmd)) if cmd.id == "41000102345"
        ));
        match parse(&["ep", "41000102345", "--servers"]).command {
            Some(Command::Episodes(cmd)) => {
                assert_eq!(cmd.id, "41000102345");
                assert!(cmd.servers);
            }
            _ => panic!("Expected Episodes command"),
        }
    }

    #[test]
    fn test_genre_and_country_listings() {
        match parse(&["genre", "romance", "--page", "3"]).command {
            Some(Command::Genre(cmd)) => {
                assert_eq!(cmd.slug, "romance");
                assert_eq!(cmd.page, 3);
            }
            _ => panic!("Expected Genre command"),
        }
        match parse(&["country", "cn"]).command {
            Some(Command::Country(cmd)) => {
                assert_eq!(cmd.code, "cn");
                assert_eq!(cmd.page, 1);
            }
            _ => panic!("Expected Country command"),
        }
        assert!(matches!(parse(&["genres"]).command, Some(Command::Genres)));
        assert!(matches!(parse(&["countries"]).command, Some(Command::Countries)));
    }

    #[test]
    fn test_watch_defaults() {
        match parse(&["w", "41000102345"]).command {
            Some(Command::Watch(cmd)) => {
                assert_eq!(cmd.drama_id, "41000102345");
                assert_eq!(cmd.episode, None);
                assert_eq!(cmd.server, None);
                assert_eq!(cmd.player, None);
                assert!(cmd.start_secs().is_none());
                assert!(!cmd.url_only);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_watch_url_only_and_player() {
        match parse(&["watch", "1", "--url-only", "--player", "mpv"]).command {
            Some(Command::Watch(cmd)) => {
                assert!(cmd.url_only);
                assert_eq!(cmd.player, Some(PlayerChoice::Mpv));
            }
            _ => panic!("Expected Watch command"),
        }
        assert!(Cli::try_parse_from(["dracin", "watch", "1", "-P", "quicktime"]).is_err());
    }

    #[test]
    fn test_watch_invalid_start() {
        match parse(&["watch", "1", "--start", "later"]).command {
            Some(Command::Watch(cmd)) => {
                assert_eq!(
                    cmd.start_secs(),
                    Some(Err("Invalid start position: later".to_string()))
                );
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_history_favorites_and_serve() {
        match parse(&["history", "--searches", "--clear"]).command {
            Some(Command::History(cmd)) => {
                assert!(cmd.searches);
                assert!(cmd.clear);
            }
            _ => panic!("Expected History command"),
        }
        assert!(matches!(parse(&["favorites"]).command, Some(Command::Favorites)));
        assert!(matches!(
            parse(&["fav", "41000102345"]).command,
            Some(Command::Favorite(ref cmd)) if cmd.id == "41000102345"
        ));
        match parse(&["serve", "--host", "0.0.0.0", "-p", "8080"]).command {
            Some(Command::Serve(cmd)) => {
                assert_eq!(cmd.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(cmd.port, Some(8080));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["genres", "--json", "-c", "/tmp/dracin.toml"]);
        assert!(cli.json);
        assert!(cli.should_json());
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/dracin.toml")));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["dracin", "download"]).is_err());
    }
}

// =============================================================================
// JSON Output Tests
// =============================================================================

mod json_output {
    use dracin::cli::{ExitCode, FavoriteResponse, JsonOutput};

    #[test]
    fn test_success_envelope_omits_error() {
        let output = JsonOutput::success(FavoriteResponse {
            id: "41000102345".into(),
            favorite: true,
        });
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["data"]["id"], "41000102345");
        assert_eq!(json["data"]["favorite"], true);
        assert!(json.get("error").is_none());
        assert!(json.get("exit_code").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let output = JsonOutput::<()>::error_msg("Episode not found.", ExitCode::NotFound);
        let json = serde_json::to_value(&output).unwrap();

        assert!(json.get("data").is_none());
        assert_eq!(json["error"], "Episode not found.");
        assert_eq!(json["exit_code"], 4);
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use dracin::cli::{EpisodesCmd, ExitCode, GenreCmd, Output, WatchCmd};
    use dracin::commands::{self, Context};
    use dracin::config::Config;
    use mockito::{Matcher, Mock, Server, ServerGuard};

    const EPISODES: &str = r#"[
        {
            "chapterId": "c1",
            "chapterIndex": 0,
            "cdnList": [
                { "cdnDomain": "cdn-a", "videoPathList": [ { "quality": 720, "videoPath": "https://cdn-a/1.m3u8" } ] }
            ]
        },
        {
            "chapterId": "c2",
            "chapterIndex": 1,
            "cdnList": [
                {
                    "cdnDomain": "cdn-a",
                    "videoPathList": [
                        { "quality": 540, "videoPath": "https://cdn-a/2-540.mp4" },
                        { "quality": 720, "videoPath": "https://cdn-a/2-720.mp4" }
                    ]
                }
            ]
        }
    ]"#;

    fn quiet_json() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn context(server: &ServerGuard) -> Context {
        let mut config = Config::default();
        config.api.base_url = server.url();
        Context::new(config)
    }

    async fn mock_episodes(server: &mut ServerGuard) -> Mock {
        server
            .mock("GET", "/api/dramabox/allepisode")
            .match_query(Matcher::UrlEncoded("bookId".into(), "d1".into()))
            .with_status(200)
            .with_body(EPISODES)
            .create_async()
            .await
    }

    fn watch(episode: Option<u32>, server: Option<usize>, start: Option<&str>) -> WatchCmd {
        WatchCmd {
            drama_id: "d1".into(),
            episode,
            server,
            player: None,
            start: start.map(str::to_string),
            url_only: true,
        }
    }

    #[tokio::test]
    async fn test_episodes_cmd_succeeds() {
        let mut server = Server::new_async().await;
        let _mock = mock_episodes(&mut server).await;
        let ctx = context(&server);

        let code = commands::episodes_cmd(
            EpisodesCmd {
                id: "d1".into(),
                servers: true,
            },
            &ctx,
            &quiet_json(),
        )
        .await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_episodes_cmd_network_error() {
        let mut config = Config::default();
        config.api.base_url = "http://127.0.0.1:9".into();
        let ctx = Context::new(config);

        let code = commands::episodes_cmd(
            EpisodesCmd {
                id: "d1".into(),
                servers: false,
            },
            &ctx,
            &quiet_json(),
        )
        .await;
        assert_eq!(code, ExitCode::NetworkError);
    }

    #[tokio::test]
    async fn test_watch_url_only() {
        let mut server = Server::new_async().await;
        let _mock = mock_episodes(&mut server).await;
        let ctx = context(&server);

        let code = commands::watch_cmd(watch(Some(2), Some(1), None), &ctx, &quiet_json()).await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_watch_unknown_episode() {
        let mut server = Server::new_async().await;
        let _mock = mock_episodes(&mut server).await;
        let ctx = context(&server);

        let code = commands::watch_cmd(watch(Some(9), None, None), &ctx, &quiet_json()).await;
        assert_eq!(code, ExitCode::NotFound);
    }

    #[tokio::test]
    async fn test_watch_server_out_of_range() {
        let mut server = Server::new_async().await;
        let _mock = mock_episodes(&mut server).await;
        let ctx = context(&server);

        let code = commands::watch_cmd(watch(Some(1), Some(3), None), &ctx, &quiet_json()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_watch_invalid_start() {
        let server = Server::new_async().await;
        let ctx = context(&server);

        let code = commands::watch_cmd(watch(None, None, Some("soon")), &ctx, &quiet_json()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_genre_listing_degrades_when_upstream_down() {
        let mut config = Config::default();
        config.api.base_url = "http://127.0.0.1:9".into();
        let ctx = Context::new(config);

        let code = commands::genre_cmd(
            GenreCmd {
                slug: "romance".into(),
                page: 1,
            },
            &ctx,
            &quiet_json(),
        )
        .await;
        assert_eq!(code, ExitCode::Success);
    }

    #[test]
    fn test_static_indexes() {
        let ctx = Context::new(Config::default());
        assert_eq!(commands::genres_cmd(&ctx, &quiet_json()), ExitCode::Success);
        assert_eq!(commands::countries_cmd(&ctx, &quiet_json()), ExitCode::Success);
    }
}
